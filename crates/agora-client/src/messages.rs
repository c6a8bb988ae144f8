use agora_core::{
  Operation,
  entities::{Message, MessageContent},
};
use serde_json::json;

use crate::{
  Result,
  remote::Remote,
  transport::{ApiRequest, Transport},
};

impl<T: Transport> Remote<'_, T, Message> {
  /// Reply in `message`'s thread; returns the message that was sent.
  pub async fn reply(&self, message: &Message, content: MessageContent) -> Result<Message> {
    let path = message.reply_path()?;
    let request = ApiRequest::post(path).json(json!({ "content": content }));
    let resp = self.send(request, Operation::Reply).await?;
    self.decode_one(&resp, Operation::Reply)
  }
}
