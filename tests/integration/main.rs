mod common;

mod lifecycle;
mod messages;
mod units;
mod updates;
mod webhooks;
