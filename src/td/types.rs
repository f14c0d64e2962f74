// Domain objects exchanged with the native client. These are classical
// tagged unions; every `get_id()`-style dispatch in consumers is an
// exhaustive match.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct TdError {
    pub code: i32,
    pub message: String,
}

impl TdError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        TdError {
            code,
            message: message.into(),
        }
    }
}

// --- Users ---

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Usernames {
    pub active_usernames: Vec<String>,
    pub editable_username: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotInfo {
    pub can_join_groups: bool,
    pub can_read_all_group_messages: bool,
    pub is_inline: bool,
    pub can_connect_to_business: bool,
    pub can_be_edited: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserKind {
    Regular,
    Bot(BotInfo),
    Deleted,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub usernames: Option<Usernames>,
    pub language_code: String,
    pub is_premium: bool,
    pub added_to_attachment_menu: bool,
    pub have_access: bool,
    pub kind: UserKind,
    pub profile_photo: Option<Value>,
    // Full-info fields, merged in when the native client has them.
    pub bio: Option<String>,
    pub birthdate: Option<Value>,
    pub business_info: Option<Value>,
    pub personal_chat_id: i64,
    pub has_private_forwards: bool,
    pub has_restricted_voice_and_video_messages: bool,
}

// --- Groups ---

#[derive(Debug, Clone, PartialEq)]
pub enum ChatMemberStatus {
    Creator {
        custom_title: String,
        is_anonymous: bool,
        is_member: bool,
    },
    Administrator {
        custom_title: String,
        can_be_edited: bool,
        rights: Value,
    },
    Member,
    Restricted {
        is_member: bool,
        restricted_until_date: i32,
        permissions: Value,
    },
    Left,
    Banned {
        banned_until_date: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicGroup {
    pub id: i64,
    pub member_count: i32,
    pub status: ChatMemberStatus,
    pub is_active: bool,
    pub upgraded_to_supergroup_id: i64,
    pub description: Option<String>,
    pub invite_link: Option<String>,
    pub photo: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Supergroup {
    pub id: i64,
    pub usernames: Option<Usernames>,
    pub date: i32,
    pub status: ChatMemberStatus,
    pub is_channel: bool,
    pub is_forum: bool,
    pub has_location: bool,
    pub join_to_send_messages: bool,
    pub join_by_request: bool,
    // Full-info fields.
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

// --- Chats ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private { user_id: i64 },
    BasicGroup { group_id: i64 },
    Supergroup { supergroup_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
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

// --- Messages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSender {
    User(i64),
    Chat(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOrigin {
    User(i64),
    Chat { chat_id: i64, author_signature: String },
    Channel {
        chat_id: i64,
        message_id: i64,
        author_signature: String,
    },
    HiddenUser(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardInfo {
    pub origin: ForwardOrigin,
    pub date: i32,
    pub is_imported: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyTo {
    Message { chat_id: i64, message_id: i64 },
    Story { chat_id: i64, story_id: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sticker {
    pub file: Value,
    pub set_id: i64,
    pub width: i32,
    pub height: i32,
    pub emoji: String,
    pub format: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollInfo {
    pub id: i64,
    pub question: String,
    pub options: Value,
    pub total_voter_count: i32,
    pub is_anonymous: bool,
    pub kind: Value,
    pub open_period: i32,
    pub close_date: i32,
    pub is_closed: bool,
}

/// Message content. Media payloads the engine never inspects stay opaque
/// `Value`s; stickers keep enough structure for set-name hydration.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text { text: String, entities: Value, link_preview: Option<Value> },
    Animation { media: Value, caption: Value },
    Audio { media: Value, caption: Value },
    Document { media: Value, caption: Value },
    Photo { media: Value, caption: Value, has_spoiler: bool },
    Video { media: Value, caption: Value, has_spoiler: bool },
    VideoNote { media: Value },
    VoiceNote { media: Value, caption: Value },
    Sticker(Sticker),
    Contact(Value),
    Dice(Value),
    Game(Value),
    Poll(PollInfo),
    Location(Value),
    Venue(Value),
    Invoice(Value),
    Story(Value),
    PaidMedia(Value),
    // Service messages.
    PinnedMessage { message_id: i64 },
    ChatAddMembers { user_ids: Vec<i64> },
    ChatDeleteMember { user_id: i64 },
    ChatChangeTitle { title: String },
    ChatChangePhoto(Value),
    ChatDeletePhoto,
    ChatJoinByLink,
    ChatJoinByRequest,
    ChatUpgradeTo { supergroup_id: i64 },
    ChatUpgradeFrom { title: String, group_id: i64 },
    ForumTopicCreated(Value),
    ForumTopicEdited(Value),
    ForumTopicIsClosedToggled { is_closed: bool },
    VideoChatScheduled { start_date: i32 },
    VideoChatStarted,
    VideoChatEnded { duration: i32 },
    MessageAutoDeleteTimerChanged { time: i32 },
    SuccessfulPayment(Value),
    GiveawayCreated(Value),
    Giveaway(Value),
    GiveawayWinners(Value),
    WriteAccessAllowed(Value),
    WebAppDataReceived(Value),
    ProximityAlertTriggered(Value),
    ChatBackgroundSet(Value),
    UsersShared(Value),
    ChatShared(Value),
    BoostApplied { boost_count: i32 },
    // Content the gateway refuses to emit as updates.
    GameScore { game_message_id: i64, score: i32 },
    PaymentSuccessfulSent(Value),
    Call(Value),
    ExpiredPhoto,
    ExpiredVideo,
    ExpiredVideoNote,
    ExpiredVoiceNote,
    ScreenshotTaken,
    ContactRegistered,
    WebsiteConnected(Value),
    PassportDataSent(Value),
    Unsupported,
}

// --- Reply markup ---

#[derive(Debug, Clone, PartialEq)]
pub enum InlineButtonKind {
    Url { url: String },
    /// `id` carries the resolved bot user id; a negative sign encodes the
    /// button's request-write-access flag until resolution rewrites it.
    LoginUrl {
        url: String,
        id: i64,
        forward_text: String,
    },
    Callback { data: Vec<u8> },
    CallbackGame,
    SwitchInline { query: String, target: Value },
    WebApp { url: String },
    Pay,
    CopyText { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineButton {
    pub text: String,
    pub kind: InlineButtonKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyMarkup {
    InlineKeyboard { rows: Vec<Vec<InlineButton>> },
    ShowKeyboard(Value),
    RemoveKeyboard { is_personal: bool },
    ForceReply {
        is_personal: bool,
        input_field_placeholder: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub message_thread_id: i64,
    pub sender: MessageSender,
    pub date: i32,
    pub edit_date: i32,
    pub is_outgoing: bool,
    pub is_channel_post: bool,
    pub is_topic_message: bool,
    pub is_from_offline: bool,
    pub can_be_saved: bool,
    pub media_album_id: i64,
    pub via_bot_user_id: i64,
    pub author_signature: String,
    pub sender_boost_count: i32,
    pub effect_id: i64,
    pub self_destruct_time: i32,
    pub initial_send_date: i32,
    pub forward_info: Option<ForwardInfo>,
    pub reply_to: Option<ReplyTo>,
    pub content: MessageContent,
    pub reply_markup: Option<ReplyMarkup>,
}

/// Wrapper the native client uses for messages flowing over a business
/// connection; the replied-to message rides along when it is available.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessMessage {
    pub message: Message,
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusinessConnection {
    pub id: String,
    pub user_id: i64,
    pub user_chat_id: i64,
    pub date: i32,
    pub can_reply: bool,
    pub is_enabled: bool,
}

// --- Files / sticker sets ---

#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: i32,
    pub size: i64,
    pub expected_size: i64,
    pub local_path: String,
    pub is_downloading_completed: bool,
    pub remote_id: String,
    pub remote_unique_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StickerSet {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub sticker_type: Value,
    pub stickers: Value,
}

// --- Queries from users ---

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackPayload {
    Data(Vec<u8>),
    Game(String),
}

// --- Input objects (gateway → native client) ---

#[derive(Debug, Clone, PartialEq)]
pub enum InputFile {
    /// Remote file id known to the native client.
    Remote(String),
    /// Path on the gateway host (local mode only).
    Local(String),
    /// Bytes uploaded by the HTTP layer via `attach://NAME`.
    Memory { filename: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputMessageContent {
    Text {
        text: String,
        entities: Value,
        link_preview_options: Value,
    },
    Animation { file: InputFile, thumbnail: Option<InputFile>, caption: Value, extra: Value },
    Audio { file: InputFile, thumbnail: Option<InputFile>, caption: Value, extra: Value },
    Document { file: InputFile, thumbnail: Option<InputFile>, caption: Value, extra: Value },
    Photo { file: InputFile, caption: Value, extra: Value },
    Video { file: InputFile, thumbnail: Option<InputFile>, caption: Value, extra: Value },
    VideoNote { file: InputFile, thumbnail: Option<InputFile>, extra: Value },
    VoiceNote { file: InputFile, caption: Value, extra: Value },
    Sticker { file: InputFile, emoji: String },
    Location(Value),
    Venue(Value),
    Contact(Value),
    Dice { emoji: String },
    Game { bot_user_id: i64, short_name: String },
    Invoice(Value),
    Poll(Value),
    Story(Value),
}
