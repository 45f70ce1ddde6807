use core::fmt::Write;

use newt_msg::Message;
use tinyvec::ArrayVec;
use toad_writable::Writable;

pub(crate) fn msg_summary(msg: &Message) -> Writable<ArrayVec<[u8; 64]>> {
  let mut buf: Writable<ArrayVec<[u8; 64]>> = Default::default();
  write!(buf,
         "{:?} {:?} {} id {} with {} byte payload",
         msg.ty,
         msg.code.kind(),
         msg.code,
         msg.id.0,
         msg.payload.0.len()).ok();
  buf
}
