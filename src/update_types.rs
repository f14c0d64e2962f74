// Update kinds, the allowed-updates mask, per-kind TTLs and the 64-bit
// webhook queue tags that keep per-subject ordering across deliveries.

/// Every update kind the gateway can emit, in mask-bit order. The two
/// custom kinds are internal and excluded from the default mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum UpdateKind {
    Message = 0,
    EditedMessage = 1,
    ChannelPost = 2,
    EditedChannelPost = 3,
    BusinessConnection = 4,
    BusinessMessage = 5,
    EditedBusinessMessage = 6,
    DeletedBusinessMessages = 7,
    MessageReaction = 8,
    MessageReactionCount = 9,
    InlineQuery = 10,
    ChosenInlineResult = 11,
    CallbackQuery = 12,
    ShippingQuery = 13,
    PreCheckoutQuery = 14,
    Poll = 15,
    PollAnswer = 16,
    MyChatMember = 17,
    ChatMember = 18,
    ChatJoinRequest = 19,
    ChatBoost = 20,
    RemovedChatBoost = 21,
    CustomEvent = 22,
    CustomQuery = 23,
}

pub const ALL_UPDATE_KINDS: [UpdateKind; 24] = [
    UpdateKind::Message,
    UpdateKind::EditedMessage,
    UpdateKind::ChannelPost,
    UpdateKind::EditedChannelPost,
    UpdateKind::BusinessConnection,
    UpdateKind::BusinessMessage,
    UpdateKind::EditedBusinessMessage,
    UpdateKind::DeletedBusinessMessages,
    UpdateKind::MessageReaction,
    UpdateKind::MessageReactionCount,
    UpdateKind::InlineQuery,
    UpdateKind::ChosenInlineResult,
    UpdateKind::CallbackQuery,
    UpdateKind::ShippingQuery,
    UpdateKind::PreCheckoutQuery,
    UpdateKind::Poll,
    UpdateKind::PollAnswer,
    UpdateKind::MyChatMember,
    UpdateKind::ChatMember,
    UpdateKind::ChatJoinRequest,
    UpdateKind::ChatBoost,
    UpdateKind::RemovedChatBoost,
    UpdateKind::CustomEvent,
    UpdateKind::CustomQuery,
];

impl UpdateKind {
    /// The Bot-API field name; also the payload prefix stored in the TQueue.
    pub fn name(self) -> &'static str {
        match self {
            UpdateKind::Message => "message",
            UpdateKind::EditedMessage => "edited_message",
            UpdateKind::ChannelPost => "channel_post",
            UpdateKind::EditedChannelPost => "edited_channel_post",
            UpdateKind::BusinessConnection => "business_connection",
            UpdateKind::BusinessMessage => "business_message",
            UpdateKind::EditedBusinessMessage => "edited_business_message",
            UpdateKind::DeletedBusinessMessages => "deleted_business_messages",
            UpdateKind::MessageReaction => "message_reaction",
            UpdateKind::MessageReactionCount => "message_reaction_count",
            UpdateKind::InlineQuery => "inline_query",
            UpdateKind::ChosenInlineResult => "chosen_inline_result",
            UpdateKind::CallbackQuery => "callback_query",
            UpdateKind::ShippingQuery => "shipping_query",
            UpdateKind::PreCheckoutQuery => "pre_checkout_query",
            UpdateKind::Poll => "poll",
            UpdateKind::PollAnswer => "poll_answer",
            UpdateKind::MyChatMember => "my_chat_member",
            UpdateKind::ChatMember => "chat_member",
            UpdateKind::ChatJoinRequest => "chat_join_request",
            UpdateKind::ChatBoost => "chat_boost",
            UpdateKind::RemovedChatBoost => "removed_chat_boost",
            UpdateKind::CustomEvent => "custom_event",
            UpdateKind::CustomQuery => "custom_query",
        }
    }

    pub fn from_name(name: &str) -> Option<UpdateKind> {
        ALL_UPDATE_KINDS.iter().copied().find(|k| k.name() == name)
    }

    /// Seconds an update of this kind stays retrievable. Interactive queries
    /// go stale fast; everything else keeps the one-day window.
    pub fn ttl(self) -> i64 {
        match self {
            UpdateKind::InlineQuery
            | UpdateKind::ChosenInlineResult
            | UpdateKind::CallbackQuery
            | UpdateKind::ShippingQuery
            | UpdateKind::PreCheckoutQuery => 3600,
            _ => 86400,
        }
    }

    pub fn bit(self) -> u32 {
        1u32 << (self as u32)
    }
}

/// Allowed-update-types mask. Bits are never gained silently; only
/// `getUpdates`/`setWebhook` with `allowed_updates`, or the persisted option
/// restored at startup, replace the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedUpdates(pub u32);

impl AllowedUpdates {
    pub const DEFAULT: AllowedUpdates = AllowedUpdates(
        !(1u32 << (UpdateKind::CustomEvent as u32) | 1u32 << (UpdateKind::CustomQuery as u32))
            & ((1u32 << 24) - 1),
    );

    pub fn admits(self, kind: UpdateKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Parse a JSON array of lowercase kind names. Empty arrays, unknown
    /// names only, or malformed JSON all yield the default mask.
    pub fn parse(input: &str) -> AllowedUpdates {
        let Ok(serde_json::Value::Array(items)) = serde_json::from_str(input) else {
            return AllowedUpdates::DEFAULT;
        };
        let mut mask = 0u32;
        for item in items {
            if let Some(name) = item.as_str()
                && let Some(kind) = UpdateKind::from_name(name)
            {
                mask |= kind.bit();
            }
        }
        if mask == 0 {
            AllowedUpdates::DEFAULT
        } else {
            AllowedUpdates(mask)
        }
    }

    /// Restore from the persisted option value without sign extension.
    pub fn from_stored(raw: i64) -> AllowedUpdates {
        let mask = raw as u32;
        if mask == 0 {
            AllowedUpdates::DEFAULT
        } else {
            AllowedUpdates(mask)
        }
    }

    /// The i64 pattern persisted through the option channel.
    pub fn to_stored(self) -> i64 {
        self.0 as i64
    }

    /// Kind names present in the mask, for getWebhookInfo.
    pub fn names(self) -> Vec<&'static str> {
        ALL_UPDATE_KINDS
            .iter()
            .copied()
            .filter(|k| {
                !matches!(k, UpdateKind::CustomEvent | UpdateKind::CustomQuery)
                    && self.admits(*k)
            })
            .map(|k| k.name())
            .collect()
    }
}

/// Per-subject queue tag. Each category adds a distinct high-bit domain
/// offset so updates about the same id in different categories land in
/// different queues; the TQueue preserves order within one tag.
pub fn webhook_queue_id(kind: UpdateKind, subject_id: i64) -> i64 {
    let offset = |k: i64| k << 33;
    match kind {
        UpdateKind::Message
        | UpdateKind::EditedMessage
        | UpdateKind::ChannelPost
        | UpdateKind::EditedChannelPost => subject_id,
        UpdateKind::InlineQuery => subject_id + offset(1),
        UpdateKind::ChosenInlineResult => subject_id + offset(2),
        UpdateKind::CallbackQuery => subject_id + offset(3),
        UpdateKind::ShippingQuery | UpdateKind::PreCheckoutQuery => subject_id + offset(4),
        UpdateKind::MyChatMember => subject_id + offset(5),
        UpdateKind::ChatMember | UpdateKind::ChatJoinRequest => subject_id + offset(6),
        UpdateKind::ChatBoost | UpdateKind::RemovedChatBoost => subject_id + offset(7),
        UpdateKind::MessageReaction => subject_id + offset(8),
        UpdateKind::MessageReactionCount => subject_id + offset(9),
        UpdateKind::BusinessConnection => subject_id + offset(10),
        UpdateKind::BusinessMessage
        | UpdateKind::EditedBusinessMessage
        | UpdateKind::DeletedBusinessMessages => subject_id + offset(11),
        // Polls key by the poll id itself.
        UpdateKind::Poll | UpdateKind::PollAnswer => subject_id,
        UpdateKind::CustomEvent | UpdateKind::CustomQuery => subject_id,
    }
}
