// Entity Cache records: the client actor's own projections of native
// objects. The Update Ingestor is the single writer; everything else refers
// to entries by id and never holds a pointer back into the cache.

use serde_json::Value;

use crate::td;

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub active_usernames: Vec<String>,
    pub editable_username: String,
    pub language_code: String,
    pub have_access: bool,
    pub is_premium: bool,
    pub added_to_attachment_menu: bool,
    pub kind: td::UserKind,
    pub profile_photo: Option<Value>,
    pub bio: Option<String>,
    pub birthdate: Option<Value>,
    pub business_info: Option<Value>,
    pub personal_chat_id: i64,
    pub has_private_forwards: bool,
    pub has_restricted_voice_and_video_messages: bool,
}

impl UserInfo {
    pub fn from_td(user: &td::User) -> Self {
        let (active_usernames, editable_username) = match &user.usernames {
            Some(u) => (u.active_usernames.clone(), u.editable_username.clone()),
            None => (Vec::new(), String::new()),
        };
        UserInfo {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            active_usernames,
            editable_username,
            language_code: user.language_code.clone(),
            have_access: user.have_access,
            is_premium: user.is_premium,
            added_to_attachment_menu: user.added_to_attachment_menu,
            kind: user.kind.clone(),
            profile_photo: user.profile_photo.clone(),
            bio: user.bio.clone(),
            birthdate: user.birthdate.clone(),
            business_info: user.business_info.clone(),
            personal_chat_id: user.personal_chat_id,
            has_private_forwards: user.has_private_forwards,
            has_restricted_voice_and_video_messages: user
                .has_restricted_voice_and_video_messages,
        }
    }

    /// Public username, if the user has one.
    pub fn username(&self) -> Option<&str> {
        self.active_usernames.first().map(|s| s.as_str())
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, td::UserKind::Bot(_))
    }
}

#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub id: i64,
    pub member_count: i32,
    pub status: td::ChatMemberStatus,
    pub is_active: bool,
    pub upgraded_to_supergroup_id: i64,
    pub description: Option<String>,
    pub invite_link: Option<String>,
    pub photo: Option<Value>,
}

impl GroupInfo {
    pub fn from_td(group: &td::BasicGroup) -> Self {
        GroupInfo {
            id: group.id,
            member_count: group.member_count,
            status: group.status.clone(),
            is_active: group.is_active,
            upgraded_to_supergroup_id: group.upgraded_to_supergroup_id,
            description: group.description.clone(),
            invite_link: group.invite_link.clone(),
            photo: group.photo.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupergroupInfo {
    pub id: i64,
    pub active_usernames: Vec<String>,
    pub editable_username: String,
    pub date: i32,
    pub status: td::ChatMemberStatus,
    pub is_channel: bool,
    pub is_forum: bool,
    pub has_location: bool,
    pub join_to_send_messages: bool,
    pub join_by_request: bool,
    pub description: Option<String>,
    pub invite_link: Option<String>,
    pub sticker_set_id: i64,
    pub custom_emoji_sticker_set_id: i64,
    pub can_set_sticker_set: bool,
    pub is_all_history_available: bool,
    pub slow_mode_delay: i32,
    pub unrestrict_boost_count: i32,
    pub linked_chat_id: i64,
    pub location: Option<Value>,
    pub has_hidden_members: bool,
    pub has_aggressive_anti_spam_enabled: bool,
}

impl SupergroupInfo {
    pub fn from_td(supergroup: &td::Supergroup) -> Self {
        let (active_usernames, editable_username) = match &supergroup.usernames {
            Some(u) => (u.active_usernames.clone(), u.editable_username.clone()),
            None => (Vec::new(), String::new()),
        };
        SupergroupInfo {
            id: supergroup.id,
            active_usernames,
            editable_username,
            date: supergroup.date,
            status: supergroup.status.clone(),
            is_channel: supergroup.is_channel,
            is_forum: supergroup.is_forum,
            has_location: supergroup.has_location,
            join_to_send_messages: supergroup.join_to_send_messages,
            join_by_request: supergroup.join_by_request,
            description: supergroup.description.clone(),
            invite_link: supergroup.invite_link.clone(),
            sticker_set_id: supergroup.sticker_set_id,
            custom_emoji_sticker_set_id: supergroup.custom_emoji_sticker_set_id,
            can_set_sticker_set: supergroup.can_set_sticker_set,
            is_all_history_available: supergroup.is_all_history_available,
            slow_mode_delay: supergroup.slow_mode_delay,
            unrestrict_boost_count: supergroup.unrestrict_boost_count,
            linked_chat_id: supergroup.linked_chat_id,
            location: supergroup.location.clone(),
            has_hidden_members: supergroup.has_hidden_members,
            has_aggressive_anti_spam_enabled: supergroup.has_aggressive_anti_spam_enabled,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.active_usernames.first().map(|s| s.as_str())
    }
}

/// Chat kind discriminator referencing the detailed records by id only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatInfoKind {
    Private { user_id: i64 },
    Group { group_id: i64 },
    Supergroup { supergroup_id: i64 },
    Unknown,
}

#[derive(Debug, Clone)]
pub struct ChatInfo {
    pub id: i64,
    pub kind: ChatInfoKind,
    pub title: String,
    pub photo: Option<Value>,
    pub permissions: Option<Value>,
    pub message_auto_delete_time: i32,
    pub emoji_status: Option<Value>,
    pub available_reactions: Option<Value>,
    pub max_reaction_count: i32,
    pub accent_color_id: i32,
    pub background_custom_emoji_id: i64,
    pub profile_accent_color_id: i32,
    pub profile_background_custom_emoji_id: i64,
    pub has_protected_content: bool,
}

impl ChatInfo {
    /// Placeholder for a chat we only know by id.
    pub fn unknown(id: i64) -> Self {
        ChatInfo {
            id,
            kind: ChatInfoKind::Unknown,
            title: String::new(),
            photo: None,
            permissions: None,
            message_auto_delete_time: 0,
            emoji_status: None,
            available_reactions: None,
            max_reaction_count: 0,
            accent_color_id: 0,
            background_custom_emoji_id: 0,
            profile_accent_color_id: -1,
            profile_background_custom_emoji_id: 0,
            has_protected_content: false,
        }
    }

    pub fn from_td(chat: &td::Chat) -> Self {
        let kind = match chat.kind {
            td::ChatKind::Private { user_id } => ChatInfoKind::Private { user_id },
            td::ChatKind::BasicGroup { group_id } => ChatInfoKind::Group { group_id },
            td::ChatKind::Supergroup { supergroup_id } => {
                ChatInfoKind::Supergroup { supergroup_id }
            }
        };
        ChatInfo {
            id: chat.id,
            kind,
            title: chat.title.clone(),
            photo: chat.photo.clone(),
            permissions: chat.permissions.clone(),
            message_auto_delete_time: chat.message_auto_delete_time,
            emoji_status: chat.emoji_status.clone(),
            available_reactions: chat.available_reactions.clone(),
            max_reaction_count: chat.max_reaction_count,
            accent_color_id: chat.accent_color_id,
            background_custom_emoji_id: chat.background_custom_emoji_id,
            profile_accent_color_id: chat.profile_accent_color_id,
            profile_background_custom_emoji_id: chat.profile_background_custom_emoji_id,
            has_protected_content: chat.has_protected_content,
        }
    }
}

/// One cached message snapshot, keyed by (chat_id, id).
#[derive(Debug, Clone)]
pub struct MessageInfo {
    pub id: i64,
    pub chat_id: i64,
    pub message_thread_id: i64,
    pub sender: td::MessageSender,
    pub date: i32,
    pub edit_date: i32,
    pub initial_send_date: i32,
    pub media_album_id: i64,
    pub via_bot_user_id: i64,
    pub is_channel_post: bool,
    pub is_topic_message: bool,
    pub is_from_offline: bool,
    pub can_be_saved: bool,
    pub author_signature: String,
    pub sender_boost_count: i32,
    pub effect_id: i64,
    pub forward_info: Option<td::ForwardInfo>,
    pub reply_to: Option<td::ReplyTo>,
    pub content: td::MessageContent,
    pub reply_markup: Option<td::ReplyMarkup>,
    /// Set by the ingestor when an edit actually changed the content.
    pub is_content_changed: bool,
    // Set when the message arrived over a business connection.
    pub business_connection_id: String,
    pub business_reply_to_message: Option<Box<MessageInfo>>,
    pub sender_business_bot_user_id: i64,
}

impl MessageInfo {
    pub fn from_td(message: &td::Message) -> Self {
        let initial_send_date = match &message.forward_info {
            Some(info) => info.date,
            None => message.date,
        };
        MessageInfo {
            id: message.id,
            chat_id: message.chat_id,
            message_thread_id: message.message_thread_id,
            sender: message.sender,
            date: message.date,
            edit_date: message.edit_date,
            initial_send_date,
            media_album_id: message.media_album_id,
            via_bot_user_id: message.via_bot_user_id,
            is_channel_post: message.is_channel_post,
            is_topic_message: message.is_topic_message,
            is_from_offline: message.is_from_offline,
            can_be_saved: message.can_be_saved,
            author_signature: message.author_signature.clone(),
            sender_boost_count: message.sender_boost_count,
            effect_id: message.effect_id,
            forward_info: message.forward_info.clone(),
            reply_to: message.reply_to.clone(),
            content: message.content.clone(),
            reply_markup: message.reply_markup.clone(),
            is_content_changed: false,
            business_connection_id: String::new(),
            business_reply_to_message: None,
            sender_business_bot_user_id: 0,
        }
    }

    /// The replied-to message id when the reply points into the same chat.
    pub fn reply_to_message_id_in(&self, chat_id: i64) -> Option<i64> {
        match &self.reply_to {
            Some(td::ReplyTo::Message {
                chat_id: reply_chat_id,
                message_id,
            }) if *reply_chat_id == chat_id => Some(*message_id),
            _ => None,
        }
    }

    /// Sticker-set id, for sticker content only.
    pub fn sticker_set_id(&self) -> Option<i64> {
        match &self.content {
            td::MessageContent::Sticker(sticker) if sticker.set_id != 0 => Some(sticker.set_id),
            _ => None,
        }
    }
}
