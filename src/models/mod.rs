pub mod block;
pub mod conversation;
pub mod message;
pub mod watermark;
