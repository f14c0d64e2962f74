// Command/event vocabulary of the native-client bus.

use serde_json::Value;

use super::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationState {
    WaitTdlibParameters,
    WaitPhoneNumber,
    Ready,
    LoggingOut,
    Closing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    WaitingForNetwork,
    Connecting,
    Updating,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Empty,
}

/// Parameters for the native client's storage and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TdlibParameters {
    pub database_directory: String,
    pub use_test_dc: bool,
    pub api_id: i32,
    pub api_hash: String,
    pub device_model: String,
    pub application_version: String,
}

/// Functions the gateway dispatches into the native client. Payloads the
/// engine never inspects ride as opaque `Value`s.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    // Lifecycle.
    SetOption { name: String, value: OptionValue },
    SetTdlibParameters(TdlibParameters),
    CheckAuthenticationBotToken { token: String },
    GetMe,
    LogOut,
    Close,

    // Messages.
    SendMessage {
        chat_id: i64,
        message_thread_id: i64,
        business_connection_id: String,
        reply_to: Option<ReplyTo>,
        disable_notification: bool,
        protect_content: bool,
        effect_id: i64,
        reply_markup: Option<ReplyMarkup>,
        content: InputMessageContent,
    },
    SendMessageAlbum {
        chat_id: i64,
        message_thread_id: i64,
        business_connection_id: String,
        reply_to: Option<ReplyTo>,
        disable_notification: bool,
        protect_content: bool,
        effect_id: i64,
        contents: Vec<InputMessageContent>,
    },
    ForwardMessages {
        chat_id: i64,
        message_thread_id: i64,
        from_chat_id: i64,
        message_ids: Vec<i64>,
        disable_notification: bool,
        protect_content: bool,
        send_copy: bool,
        remove_caption: bool,
    },
    EditMessageText {
        chat_id: i64,
        message_id: i64,
        reply_markup: Option<ReplyMarkup>,
        content: InputMessageContent,
    },
    EditInlineMessageText {
        inline_message_id: String,
        reply_markup: Option<ReplyMarkup>,
        content: InputMessageContent,
    },
    EditMessageMedia {
        chat_id: i64,
        message_id: i64,
        reply_markup: Option<ReplyMarkup>,
        content: InputMessageContent,
    },
    EditInlineMessageMedia {
        inline_message_id: String,
        reply_markup: Option<ReplyMarkup>,
        content: InputMessageContent,
    },
    EditMessageCaption {
        chat_id: i64,
        message_id: i64,
        reply_markup: Option<ReplyMarkup>,
        caption: Value,
        show_caption_above_media: bool,
    },
    EditInlineMessageCaption {
        inline_message_id: String,
        reply_markup: Option<ReplyMarkup>,
        caption: Value,
        show_caption_above_media: bool,
    },
    EditMessageReplyMarkup {
        chat_id: i64,
        message_id: i64,
        reply_markup: Option<ReplyMarkup>,
    },
    EditInlineMessageReplyMarkup {
        inline_message_id: String,
        reply_markup: Option<ReplyMarkup>,
    },
    DeleteMessages {
        chat_id: i64,
        message_ids: Vec<i64>,
        revoke: bool,
    },
    GetMessage { chat_id: i64, message_id: i64 },
    GetRepliedMessage { chat_id: i64, message_id: i64 },
    GetCallbackQueryMessage {
        chat_id: i64,
        message_id: i64,
        callback_query_id: i64,
    },
    SendChatAction {
        chat_id: i64,
        message_thread_id: i64,
        business_connection_id: String,
        action: Value,
    },
    StopPoll {
        chat_id: i64,
        message_id: i64,
        reply_markup: Option<ReplyMarkup>,
    },
    SetMessageReaction {
        chat_id: i64,
        message_id: i64,
        reaction_types: Value,
        is_big: bool,
    },

    // User queries.
    AnswerInlineQuery {
        inline_query_id: i64,
        is_personal: bool,
        button: Value,
        results: Value,
        cache_time: i32,
        next_offset: String,
    },
    AnswerWebAppQuery { web_app_query_id: String, result: Value },
    AnswerCallbackQuery {
        callback_query_id: i64,
        text: String,
        show_alert: bool,
        url: String,
        cache_time: i32,
    },
    AnswerShippingQuery {
        shipping_query_id: i64,
        shipping_options: Value,
        error_message: String,
    },
    AnswerPreCheckoutQuery {
        pre_checkout_query_id: i64,
        error_message: String,
    },
    AnswerCustomQuery { custom_query_id: i64, data: String },

    // Payments.
    CreateInvoiceLink { invoice: Value },
    GetStarTransactions { offset: i64, limit: i32 },
    RefundStarPayment {
        user_id: i64,
        telegram_payment_charge_id: String,
    },

    // Games.
    SetGameScore {
        chat_id: i64,
        message_id: i64,
        inline_message_id: String,
        user_id: i64,
        score: i32,
        force: bool,
        edit_message: bool,
    },
    GetGameHighScores {
        chat_id: i64,
        message_id: i64,
        inline_message_id: String,
        user_id: i64,
    },

    // Chats.
    GetChat { chat_id: i64 },
    SearchPublicChat { username: String },
    SetChatPhoto { chat_id: i64, photo: InputFile },
    DeleteChatPhoto { chat_id: i64 },
    SetChatTitle { chat_id: i64, title: String },
    SetChatDescription { chat_id: i64, description: String },
    SetChatPermissions { chat_id: i64, permissions: Value },
    PinChatMessage {
        chat_id: i64,
        message_id: i64,
        disable_notification: bool,
    },
    UnpinChatMessage { chat_id: i64, message_id: i64 },
    UnpinAllChatMessages { chat_id: i64 },
    SetChatStickerSet { chat_id: i64, sticker_set_id: i64 },
    LeaveChat { chat_id: i64 },
    SetChatMemberStatus {
        chat_id: i64,
        member_id: MessageSender,
        status: Value,
    },
    BanChatMember {
        chat_id: i64,
        member_id: MessageSender,
        banned_until_date: i32,
        revoke_messages: bool,
    },
    GetChatMember { chat_id: i64, member_id: MessageSender },
    GetChatAdministrators { chat_id: i64 },
    GetChatMemberCount { chat_id: i64 },
    CreateChatInviteLink {
        chat_id: i64,
        name: String,
        expire_date: i32,
        member_limit: i32,
        creates_join_request: bool,
    },
    EditChatInviteLink {
        chat_id: i64,
        invite_link: String,
        name: String,
        expire_date: i32,
        member_limit: i32,
        creates_join_request: bool,
    },
    RevokeChatInviteLink { chat_id: i64, invite_link: String },
    ExportChatInviteLink { chat_id: i64 },
    ApproveChatJoinRequest { chat_id: i64, user_id: i64 },
    DeclineChatJoinRequest { chat_id: i64, user_id: i64 },
    GetUserChatBoosts { chat_id: i64, user_id: i64 },
    SetChatMenuButton { user_id: i64, menu_button: Value },
    GetChatMenuButton { user_id: i64 },
    CreateForumTopic {
        chat_id: i64,
        name: String,
        icon_color: i32,
        icon_custom_emoji_id: i64,
    },
    EditForumTopic {
        chat_id: i64,
        message_thread_id: i64,
        name: String,
        icon_custom_emoji_id: i64,
        edit_icon_custom_emoji: bool,
    },
    ToggleForumTopicIsClosed {
        chat_id: i64,
        message_thread_id: i64,
        is_closed: bool,
    },
    ToggleGeneralForumTopicIsHidden { chat_id: i64, is_hidden: bool },
    DeleteForumTopic { chat_id: i64, message_thread_id: i64 },
    UnpinAllForumTopicMessages { chat_id: i64, message_thread_id: i64 },
    GetForumTopicDefaultIcons,

    // Stickers.
    GetStickerSet { set_id: i64 },
    SearchStickerSet { name: String },
    GetCustomEmojiStickers { custom_emoji_ids: Vec<i64> },
    UploadStickerFile {
        user_id: i64,
        sticker_format: String,
        sticker: InputFile,
    },
    CreateNewStickerSet {
        user_id: i64,
        title: String,
        name: String,
        sticker_type: Value,
        needs_repainting: bool,
        stickers: Value,
    },
    AddStickerToSet { user_id: i64, name: String, sticker: Value },
    ReplaceStickerInSet {
        user_id: i64,
        name: String,
        old_sticker: InputFile,
        new_sticker: Value,
    },
    SetStickerSetThumbnail {
        user_id: i64,
        name: String,
        thumbnail: Option<InputFile>,
        format: String,
    },
    SetCustomEmojiStickerSetThumbnail { name: String, custom_emoji_id: i64 },
    SetStickerSetTitle { name: String, title: String },
    DeleteStickerSet { name: String },
    SetStickerPositionInSet { sticker: InputFile, position: i32 },
    RemoveStickerFromSet { sticker: InputFile },
    SetStickerEmojis { sticker: InputFile, emojis: String },
    SetStickerKeywords { sticker: InputFile, keywords: Vec<String> },
    SetStickerMaskPosition { sticker: InputFile, mask_position: Value },

    // Bot profile.
    SetCommands { scope: Value, language_code: String, commands: Value },
    GetCommands { scope: Value, language_code: String },
    DeleteCommands { scope: Value, language_code: String },
    SetDefaultAdministratorRights { for_channels: bool, rights: Value },
    GetDefaultAdministratorRights { for_channels: bool },
    SetBotName { language_code: String, name: String },
    GetBotName { language_code: String },
    SetBotInfoDescription { language_code: String, description: String },
    GetBotInfoDescription { language_code: String },
    SetBotInfoShortDescription {
        language_code: String,
        short_description: String,
    },
    GetBotInfoShortDescription { language_code: String },

    // Misc.
    SetPassportElementErrors { user_id: i64, errors: Value },
    GetBusinessConnection { connection_id: String },
    SendCustomRequest { method: String, parameters: String },
    GetRemoteFile { remote_file_id: String },
    DownloadFile { file_id: i32, priority: i32 },
}

/// Response payloads. `Raw` covers objects the gateway only re-encodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Ok,
    Message(Box<Message>),
    Messages(Vec<Option<Message>>),
    User(Box<User>),
    Chat(Box<Chat>),
    StickerSet(Box<StickerSet>),
    File(File),
    BusinessConnection(BusinessConnection),
    Text(String),
    HttpUrl(String),
    Count(i32),
    Raw(Value),
}

/// Everything the native client posts back: authorization transitions,
/// unsolicited updates, and correlated responses.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Response {
        query_id: u64,
        result: Result<Object, TdError>,
    },
    AuthorizationState(AuthorizationState),
    ConnectionState(ConnectionState),
    Option { name: String, value: OptionValue },

    NewMessage(Box<Message>),
    MessageEdited(Box<Message>),
    MessageSendSucceeded {
        message: Box<Message>,
        old_message_id: i64,
    },
    MessageSendFailed {
        chat_id: i64,
        old_message_id: i64,
        new_message_id: i64,
        error: TdError,
    },
    MessagesDeleted { chat_id: i64, message_ids: Vec<i64> },

    User(Box<User>),
    BasicGroup(Box<BasicGroup>),
    Supergroup(Box<Supergroup>),
    Chat(Box<Chat>),
    BusinessConnection(BusinessConnection),

    NewBusinessMessage {
        connection_id: String,
        message: Box<BusinessMessage>,
    },
    BusinessMessageEdited {
        connection_id: String,
        message: Box<BusinessMessage>,
    },
    BusinessMessagesDeleted {
        connection_id: String,
        chat_id: i64,
        message_ids: Vec<i64>,
    },

    File(File),
    Poll(PollInfo),
    PollAnswer {
        poll_id: i64,
        voter: MessageSender,
        option_ids: Vec<i32>,
    },

    NewInlineQuery {
        id: i64,
        sender_user_id: i64,
        query: String,
        offset: String,
        chat_type: Value,
        location: Value,
    },
    NewChosenInlineResult {
        sender_user_id: i64,
        result_id: String,
        query: String,
        inline_message_id: String,
    },
    NewCallbackQuery {
        id: i64,
        sender_user_id: i64,
        chat_id: i64,
        message_id: i64,
        chat_instance: i64,
        payload: CallbackPayload,
    },
    NewInlineCallbackQuery {
        id: i64,
        sender_user_id: i64,
        inline_message_id: String,
        chat_instance: i64,
        payload: CallbackPayload,
    },
    NewBusinessCallbackQuery {
        id: i64,
        sender_user_id: i64,
        connection_id: String,
        message: Box<BusinessMessage>,
        chat_instance: i64,
        payload: CallbackPayload,
    },
    NewShippingQuery {
        id: i64,
        sender_user_id: i64,
        invoice_payload: String,
        shipping_address: Value,
    },
    NewPreCheckoutQuery {
        id: i64,
        sender_user_id: i64,
        currency: String,
        total_amount: i64,
        invoice_payload: Vec<u8>,
        shipping_option_id: String,
        order_info: Value,
    },

    ChatMemberUpdated {
        chat_id: i64,
        actor_user_id: i64,
        date: i32,
        invite_link: Value,
        subject_user_id: i64,
        old_member: Value,
        new_member: Value,
    },
    NewChatJoinRequest {
        chat_id: i64,
        user_id: i64,
        date: i32,
        bio: String,
        invite_link: Value,
    },
    ChatBoost {
        chat_id: i64,
        boost: Value,
        is_removal: bool,
    },
    MessageReaction {
        chat_id: i64,
        message_id: i64,
        date: i32,
        actor: MessageSender,
        old_reaction_types: Value,
        new_reaction_types: Value,
    },
    MessageReactions {
        chat_id: i64,
        message_id: i64,
        date: i32,
        reactions: Value,
    },

    NewCustomEvent { event: String },
    NewCustomQuery { id: i64, data: String, timeout: i32 },
}
