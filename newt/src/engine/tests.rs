use newt_msg::{known, Block, InvalidHeader, MessageToBytesError, Payload, Token, TryFromBytes};
use std_alloc::vec::Vec;

use super::*;
use crate::test::{self, PlatformMock};

fn engine() -> Engine<PlatformMock> {
  simple_logger::init_with_level(log::Level::Trace).ok();
  Engine::new(PlatformMock::default(), Config::default())
}

fn blockwise_engine(size: u16) -> Engine<PlatformMock> {
  let mut engine = engine();
  engine.set_block_size(size).unwrap();
  engine
}

fn peer() -> SocketAddr {
  test::x.x.x.x(5683)
}

fn build(engine: &mut Engine<PlatformMock>, msg: &mut Message) -> Vec<u8> {
  let mut buf = [0u8; 1152];
  let n = engine.build(peer(), &mut buf, msg, 7).unwrap();
  buf[..n].to_vec()
}

fn token(bytes: &[u8]) -> Token {
  Token::try_from_slice(bytes).unwrap()
}

fn con_get(id: u16) -> Message {
  Message::new(Type::Con, code::GET, Id(id), token(b"tk"))
}

#[test]
fn build_assigns_ids_and_writes_them_back() {
  let mut engine = engine();

  let mut a = con_get(0);
  let mut b = Message::new(Type::Non, code::GET, Id(0), Token::default());
  build(&mut engine, &mut a);
  build(&mut engine, &mut b);

  assert_ne!(a.id, Id(0));
  assert_ne!(b.id, Id(0));
  assert_ne!(a.id, b.id);

  let mut explicit = con_get(1234);
  build(&mut engine, &mut explicit);
  assert_eq!(explicit.id, Id(1234));
}

#[test]
fn same_seed_same_ids() {
  let mut a = engine();
  let mut b = engine();

  let (mut x, mut y) = (con_get(0), con_get(0));
  build(&mut a, &mut x);
  build(&mut b, &mut y);
  assert_eq!(x.id, y.id);
}

#[test]
fn build_errors() {
  let mut engine = engine();
  let mut buf = [0u8; 64];

  let mut ack_get = Message::new(Type::Ack, code::GET, Id(1), Token::default());
  let e = engine.build(peer(), &mut buf, &mut ack_get, 0).unwrap_err();
  assert_eq!(e,
             BuildError::InvalidHeader(InvalidHeader::IllegalCodeForType { ty: Type::Ack,
                                                                           code: code::GET }));
  assert_eq!(e.code(), -1);

  let mut reset_content = Message::new(Type::Reset, code::CONTENT, Id(1), Token::default());
  assert_eq!(engine.build(peer(), &mut buf, &mut reset_content, 0),
             Err(BuildError::MalformedEmpty));

  let mut empty_with_payload = Message::new(Type::Con, code::EMPTY, Id(1), Token::default());
  empty_with_payload.payload = Payload(b"hi".to_vec());
  assert_eq!(engine.build(peer(), &mut buf, &mut empty_with_payload, 0),
             Err(BuildError::MalformedEmpty));

  let mut empty_with_token = Message::new(Type::Ack, code::EMPTY, Id(1), token(b"a"));
  assert_eq!(engine.build(peer(), &mut buf, &mut empty_with_token, 0),
             Err(BuildError::MalformedEmpty));

  let mut tiny = [0u8; 2];
  let e = engine.build(peer(), &mut tiny, &mut con_get(1), 0)
                .unwrap_err();
  assert_eq!(e,
             BuildError::ToBytes(MessageToBytesError::TooLong { capacity: 2,
                                                                size: 6 }));
  assert_eq!(e.code(), -2);
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn ack_stops_retransmission() {
  let mut engine = engine();
  let mut req = con_get(0);
  build(&mut engine, &mut req);
  assert_eq!(engine.resend_queue_len(), 1);

  // an ack from someone else doesn't count
  engine.parse(test::x.x.x.x(1), &test::bytes(&req.ack()), 0);
  assert_eq!(engine.resend_queue_len(), 1);

  let ack = engine.parse(peer(), &test::bytes(&req.ack()), 0).unwrap();
  assert_eq!(ack.status, Status::Ok);
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn reset_stops_retransmission() {
  let mut engine = engine();
  let mut req = con_get(0);
  build(&mut engine, &mut req);

  engine.parse(peer(), &test::bytes(&req.reset()), 0).unwrap();
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn retransmission_exhaustion() {
  let mut engine = engine();
  let mut req = con_get(0);
  let bytes = build(&mut engine, &mut req);

  engine.exec(Seconds(1)).unwrap();
  assert!(engine.platform().tx.is_empty());

  (1..=4).for_each(|n| {
           engine.exec(Seconds(n * 1000)).unwrap();
           assert_eq!(engine.platform().tx.len(), n as usize);
           assert_eq!(engine.resend_queue_len(), 1);
         });

  assert!(engine.platform().tx.iter().all(|dgram| dgram == &Addrd(bytes.clone(), peer())));
  assert!(engine.platform().failed.is_empty());

  engine.exec(Seconds(5000)).unwrap();
  assert_eq!(engine.platform().tx.len(), 4);
  assert_eq!(engine.resend_queue_len(), 0);

  let failed = &engine.platform().failed;
  assert_eq!(failed.len(), 1);
  let (Addrd(msg, addr), param) = &failed[0];
  assert_eq!(msg.status, Status::SendingFailed);
  assert_eq!(msg.id, req.id);
  assert_eq!(*addr, peer());
  assert_eq!(*param, 7);

  engine.exec(Seconds(6000)).unwrap();
  assert_eq!(engine.platform().failed.len(), 1);
}

#[test]
fn exec_twice_at_the_same_time_sends_once() {
  let mut engine = engine();
  build(&mut engine, &mut con_get(0));

  engine.exec(Seconds(10)).unwrap();
  assert_eq!(engine.platform().tx.len(), 1);

  engine.exec(Seconds(10)).unwrap();
  assert_eq!(engine.platform().tx.len(), 1);
}

#[test]
fn fewer_retransmissions() {
  let mut engine = engine();
  engine.set_retransmission_parameters(1, Seconds(1)).unwrap();
  build(&mut engine, &mut con_get(0));

  engine.exec(Seconds(100)).unwrap();
  engine.exec(Seconds(200)).unwrap();
  assert_eq!(engine.platform().tx.len(), 1);
  assert_eq!(engine.platform().failed.len(), 1);
}

#[test]
fn failed_sends_are_reported_after_the_sweep() {
  let mut engine = engine();
  build(&mut engine, &mut con_get(0));
  build(&mut engine, &mut con_get(0));
  engine.platform_mut().broken = true;

  let e = engine.exec(Seconds(100)).unwrap_err();
  assert_eq!(e, ExecError { failed_sends: 2 });
  assert_eq!(e.code(), -1);
  assert_eq!(engine.resend_queue_len(), 2);
}

#[test]
fn full_resend_queue_skips_silently() {
  let mut engine = engine();
  engine.set_retransmission_buffer(1, 0).unwrap();

  build(&mut engine, &mut con_get(0));
  build(&mut engine, &mut con_get(0));
  assert_eq!(engine.resend_queue_len(), 1);

  engine.set_retransmission_buffer(0, 0).unwrap();
  engine.clear_resend_queue();
  build(&mut engine, &mut con_get(0));
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn non_is_not_retransmitted() {
  let mut engine = engine();
  build(&mut engine,
        &mut Message::new(Type::Non, code::GET, Id(0), Token::default()));
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn remove_resend() {
  let mut engine = engine();
  let mut req = con_get(0);
  build(&mut engine, &mut req);
  build(&mut engine, &mut con_get(0));

  assert!(!engine.remove_resend(Id(req.id.0.wrapping_add(100))));
  assert!(engine.remove_resend(req.id));
  assert_eq!(engine.resend_queue_len(), 1);

  engine.clear_resend_queue();
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn duplicates_get_the_cached_answer() {
  let mut engine = engine();
  let req = con_get(0x77);

  let first = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(first.status, Status::Ok);
  assert_eq!(engine.duplicate_len(), 1);

  // peer retransmits before we answered; nothing to resend yet
  let dup = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(dup.status, Status::Duplicated);
  assert!(engine.platform().tx.is_empty());

  let mut rep = Message::new(Type::Ack, code::CONTENT, req.id, req.token);
  rep.payload = Payload(b"hi".to_vec());
  let answer = build(&mut engine, &mut rep);

  let dup = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(dup.status, Status::Duplicated);
  assert_eq!(engine.platform().tx, vec![Addrd(answer, peer())]);
  assert_eq!(engine.duplicate_len(), 1);
}

#[test]
fn duplicate_detection_is_per_address() {
  let mut engine = engine();
  let req = test::bytes(&con_get(1));

  engine.parse(peer(), &req, 0).unwrap();
  let other = engine.parse(test::x.x.x.x(1), &req, 0).unwrap();
  assert_eq!(other.status, Status::Ok);
}

#[test]
fn duplicate_detection_disabled() {
  let mut engine = engine();
  engine.set_duplicate_buffer_size(0).unwrap();
  let req = test::bytes(&con_get(1));

  engine.parse(peer(), &req, 0).unwrap();
  assert_eq!(engine.parse(peer(), &req, 0).unwrap().status, Status::Ok);
  assert_eq!(engine.duplicate_len(), 0);
}

#[test]
fn duplicates_expire() {
  let mut engine = engine();
  engine.set_duplicate_lifetime(Seconds(10)).unwrap();
  let req = test::bytes(&con_get(1));

  engine.parse(peer(), &req, 0).unwrap();
  engine.exec(Seconds(11)).unwrap();
  assert_eq!(engine.duplicate_len(), 0);
  assert_eq!(engine.parse(peer(), &req, 0).unwrap().status, Status::Ok);
}

#[test]
fn ping_is_answered_with_reset() {
  let mut engine = engine();

  assert_eq!(engine.parse(peer(), &[0x40, 0x00, 0x00, 0x05], 0), None);

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().ty, Type::Reset);
  assert_eq!(sent[0].data().code, code::EMPTY);
  assert_eq!(sent[0].data().id, Id(5));
  assert_eq!(sent[0].addr(), peer());
}

#[test]
fn reserved_class_is_reset() {
  let mut engine = engine();

  assert_eq!(engine.parse(peer(), &[0x40, 0b001_00000, 0x00, 0x09], 0), None);
  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().ty, Type::Reset);
  assert_eq!(sent[0].data().id, Id(9));
}

#[test]
fn other_invalid_headers_are_dropped_silently() {
  let mut engine = engine();

  // 2.06
  assert_eq!(engine.parse(peer(), &[0x40, 0b010_00110, 0x00, 0x09], 0), None);
  // version 2
  assert_eq!(engine.parse(peer(), &[0x80, 0x01, 0x00, 0x09], 0), None);
  assert!(engine.platform().tx.is_empty());
}

#[test]
fn short_datagrams_are_ignored() {
  let mut engine = engine();
  assert_eq!(engine.parse(peer(), &[0x40, 0x01, 0x00], 0), None);
  assert_eq!(engine.parse(peer(), &[], 0), None);
}

#[test]
fn malformed_con_is_reset() {
  let mut engine = engine();

  let msg = engine.parse(peer(), &[0x40, 0x01, 0x00, 0x03, 0xFF], 0)
                  .unwrap();
  assert_eq!(msg.status, Status::ParserError);
  assert_eq!(msg.id, Id(3));

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().ty, Type::Reset);
  assert_eq!(sent[0].data().id, Id(3));
}

#[test]
fn destroy_hands_back_the_platform() {
  let mut engine = engine();
  engine.parse(peer(), &[0x40, 0x00, 0x00, 0x05], 0);

  let platform = engine.destroy();
  assert_eq!(platform.tx.len(), 1);
}

#[test]
fn setters_keep_config_on_error() {
  let mut engine = engine();
  let before = engine.config();

  assert!(engine.set_block_size(100).is_err());
  assert!(engine.set_random_factor(90, 100).is_err());
  assert_eq!(engine.config(), before);

  engine.set_block_size(1024).unwrap();
  assert_eq!(engine.config().block.size, 1024);
}

#[test]
fn large_payloads_are_fragmented() {
  let mut engine = blockwise_engine(64);

  let mut req = Message::new(Type::Con, code::PUT, Id(0), token(b"put"));
  req.payload = Payload(vec![9; 100]);

  let size = engine.calc_size(&req);
  assert!(size < req.calc_size());

  let bytes = build(&mut engine, &mut req);
  assert_eq!(bytes.len(), size);
  assert_eq!(req.payload.0.len(), 100);

  let first = Message::try_from_bytes(&bytes).unwrap();
  assert_eq!(first.opts.block1(), Some(Block::new(64, 0, true)));
  assert_eq!(first.opts.size1(), Some(100));
  assert_eq!(first.payload.0, vec![9; 64]);
  assert_eq!(first.id, req.id);

  assert_eq!(engine.blockwise_sent_len(), 1);
  assert_eq!(engine.resend_queue_len(), 1);

  // the server rejects the transfer
  engine.parse(peer(), &test::bytes(&req.reset()), 0).unwrap();
  assert_eq!(engine.blockwise_sent_len(), 0);
  assert_eq!(engine.resend_queue_len(), 0);
}

#[test]
fn explicit_block_options_are_left_alone() {
  let mut engine = blockwise_engine(16);

  let mut rep = Message::new(Type::Non, code::CONTENT, Id(0), Token::default());
  rep.opts.set_block2(Block::new(32, 0, true));
  rep.payload = Payload(vec![0; 32]);

  assert_eq!(engine.calc_size(&rep), rep.calc_size());
  build(&mut engine, &mut rep);
  assert_eq!(engine.blockwise_sent_len(), 0);
}

#[test]
fn get_is_forgotten_when_answered_whole() {
  let mut engine = blockwise_engine(64);
  let mut req = con_get(0);
  build(&mut engine, &mut req);
  assert_eq!(engine.blockwise_sent_len(), 1);

  let mut rep = Message::new(Type::Ack, code::CONTENT, req.id, req.token);
  rep.payload = Payload(b"small".to_vec());
  let rep = engine.parse(peer(), &test::bytes(&rep), 0).unwrap();

  assert_eq!(rep.status, Status::Ok);
  assert_eq!(engine.blockwise_sent_len(), 0);

  build(&mut engine, &mut con_get(0));
  engine.clear_blockwise_sent();
  assert_eq!(engine.blockwise_sent_len(), 0);
}

#[test]
fn stale_blockwise_state_expires() {
  let mut engine = blockwise_engine(64);
  build(&mut engine, &mut con_get(0));

  engine.exec(Seconds(60)).ok();
  assert_eq!(engine.blockwise_sent_len(), 1);

  engine.exec(Seconds(61)).ok();
  assert_eq!(engine.blockwise_sent_len(), 0);
}

fn put_block(id: u16, block: Block, payload: Vec<u8>) -> Message {
  let mut req = Message::new(Type::Con, code::PUT, Id(id), token(b"put"));
  req.opts.set_block1(block);
  req.payload = Payload(payload);
  req
}

#[test]
fn block1_continue_downgrades_block_size() {
  let mut engine = blockwise_engine(64);

  let req = put_block(1, Block::new(128, 0, true), vec![1; 128]);
  let msg = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(msg.status, Status::BlockwiseReceiving);
  assert_eq!(engine.blockwise_received_len(), 1);

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  let cont = sent[0].data();
  assert_eq!(cont.ty, Type::Ack);
  assert_eq!(cont.id, Id(1));
  assert_eq!(cont.code, code::CONTINUE);
  assert_eq!(cont.token, req.token);
  assert_eq!(cont.opts.block1(), Some(Block::new(64, 0, true)));

  // the client continues at the smaller size
  let req = put_block(2, Block::new(64, 2, false), vec![2; 10]);
  let msg = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(msg.status, Status::BlockwiseReceived);
  assert_eq!(msg.payload.0.len(), 138);
  assert_eq!(engine.blockwise_received_len(), 0);
}

#[test]
fn block1_out_of_order() {
  let mut engine = blockwise_engine(64);

  let req = put_block(1, Block::new(64, 0, true), vec![1; 64]);
  engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  engine.platform_mut().take_sent();

  let req = put_block(2, Block::new(64, 2, true), vec![1; 64]);
  let msg = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(msg.status, Status::EntityIncomplete);
  assert_eq!(engine.blockwise_received_len(), 0);

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().code, code::REQUEST_ENTITY_INCOMPLETE);
  assert_eq!(sent[0].data().ty, Type::Ack);
  assert_eq!(sent[0].data().id, Id(2));
}

#[test]
fn block1_non_request_gets_non_answers() {
  let mut engine = blockwise_engine(64);

  let mut req = put_block(1, Block::new(64, 0, true), vec![1; 64]);
  req.ty = Type::Non;
  engine.parse(peer(), &test::bytes(&req), 0).unwrap();

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent[0].data().ty, Type::Non);
  assert_eq!(sent[0].data().code, code::CONTINUE);
  assert_ne!(sent[0].data().id, Id(0));
}

#[test]
fn block1_too_large() {
  let mut engine = blockwise_engine(64);

  let mut req = put_block(1, Block::new(64, 0, true), vec![1; 64]);
  req.opts.set_uint(known::SIZE1, 70_000);
  let msg = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(msg.status, Status::EntityTooLarge);
  assert_eq!(engine.blockwise_received_len(), 0);

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent[0].data().code, code::REQUEST_ENTITY_TOO_LARGE);
  assert_eq!(sent[0].data().opts.size1(), Some(MAX_INCOMING_MESSAGE_SIZE as u32));
}

#[test]
fn single_block_is_an_ordinary_request() {
  let mut engine = blockwise_engine(64);

  let req = put_block(1, Block::new(64, 0, false), vec![1; 20]);
  let msg = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(msg.status, Status::Ok);
  assert!(engine.platform().tx.is_empty());
}

#[test]
fn blockwise_disabled_leaves_block_options_to_the_application() {
  let mut engine = engine();

  let req = put_block(1, Block::new(64, 3, true), vec![1; 64]);
  let msg = engine.parse(peer(), &test::bytes(&req), 0).unwrap();
  assert_eq!(msg.status, Status::Ok);
  assert!(engine.platform().tx.is_empty());
}

fn continue_block1(req: &Message, id: Id, block: Block) -> Message {
  let mut cont = Message::new(Type::Ack, code::CONTINUE, id, req.token);
  cont.opts.set_block1(block);
  cont
}

fn untokened_put(len: usize) -> Message {
  let mut req = Message::new(Type::Con, code::PUT, Id(0), Token::default());
  req.payload = Payload(vec![3; len]);
  req
}

#[test]
fn repeated_continue_moves_the_transfer_forward_once() {
  let mut engine = blockwise_engine(64);
  let mut req = untokened_put(3 * 64 + 7);
  build(&mut engine, &mut req);

  let cont = test::bytes(&continue_block1(&req, req.id, Block::new(64, 0, true)));

  let ack = engine.parse(peer(), &cont, 0).unwrap();
  assert_eq!(ack.status, Status::BlockwiseAck);
  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().opts.block1(), Some(Block::new(64, 1, true)));

  // e.g. the server's cached answer to a retransmission of block 0
  let ack = engine.parse(peer(), &cont, 0).unwrap();
  assert_eq!(ack.status, Status::Ok);
  assert!(engine.platform().tx.is_empty());
  assert_eq!(engine.blockwise_sent_len(), 1);
}

#[test]
fn continue_for_a_block_we_did_not_just_send_is_ignored() {
  let mut engine = blockwise_engine(64);
  let mut req = untokened_put(3 * 64 + 7);
  build(&mut engine, &mut req);

  engine.parse(peer(),
               &test::bytes(&continue_block1(&req, req.id, Block::new(64, 0, true))),
               0)
        .unwrap();
  let block_1 = engine.platform_mut().take_sent().remove(0).0;

  let wrong = continue_block1(&req, block_1.id, Block::new(64, 2, true));
  engine.parse(peer(), &test::bytes(&wrong), 0).unwrap();
  assert!(engine.platform().tx.is_empty());

  let right = continue_block1(&req, block_1.id, Block::new(64, 1, true));
  engine.parse(peer(), &test::bytes(&right), 0).unwrap();
  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().opts.block1(), Some(Block::new(64, 2, true)));
}

fn content_block(req: &Message, id: Id, num: u32, more: bool, payload: Vec<u8>) -> Message {
  let mut rep = Message::new(Type::Ack, code::CONTENT, id, req.token);
  rep.opts.set_block2(Block::new(64, num, more));
  rep.payload = Payload(payload);
  rep
}

/// Client side of a GET whose response is 64 byte blocks; yields the request
/// and the id of the request for block 1
fn get_first_block(engine: &mut Engine<PlatformMock>) -> (Message, Id) {
  let mut req = con_get(0);
  build(engine, &mut req);

  let first = content_block(&req, req.id, 0, true, vec![0; 64]);
  let msg = engine.parse(peer(), &test::bytes(&first), 0).unwrap();
  assert_eq!(msg.status, Status::BlockwiseReceiving);

  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].data().opts.block2(), Some(Block::new(64, 1, false)));
  (req, sent[0].data().id)
}

#[test]
fn repeated_block2_response_is_a_duplicate() {
  let mut engine = blockwise_engine(64);
  let (req, id) = get_first_block(&mut engine);

  let second = test::bytes(&content_block(&req, id, 1, true, vec![1; 64]));
  assert_eq!(engine.parse(peer(), &second, 0).unwrap().status,
             Status::BlockwiseReceiving);
  let next_id = engine.platform_mut().take_sent().remove(0).data().id;

  let again = engine.parse(peer(), &second, 0).unwrap();
  assert_eq!(again.status, Status::Duplicated);

  let first = content_block(&req, req.id, 0, true, vec![0; 64]);
  let again = engine.parse(peer(), &test::bytes(&first), 0).unwrap();
  assert_eq!(again.status, Status::Duplicated);

  assert!(engine.platform().tx.is_empty());
  assert_eq!(engine.blockwise_sent_len(), 1);
  assert_eq!(engine.blockwise_received_len(), 2);

  let last = content_block(&req, next_id, 2, false, vec![2; 7]);
  let done = engine.parse(peer(), &test::bytes(&last), 0).unwrap();
  assert_eq!(done.status, Status::BlockwiseReceived);
  assert_eq!(done.payload.0.len(), 2 * 64 + 7);
  assert_eq!(engine.blockwise_sent_len(), 0);
}

#[test]
fn block2_out_of_order() {
  let mut engine = blockwise_engine(64);
  let (req, id) = get_first_block(&mut engine);

  let skipped = content_block(&req, id, 2, true, vec![2; 64]);
  let msg = engine.parse(peer(), &test::bytes(&skipped), 0).unwrap();

  assert_eq!(msg.status, Status::EntityIncomplete);
  assert_eq!(engine.blockwise_sent_len(), 0);
  assert_eq!(engine.blockwise_received_len(), 0);
  assert!(engine.platform().tx.is_empty());
}

#[test]
fn block2_too_large() {
  let mut engine = blockwise_engine(64);
  let mut req = con_get(0);
  build(&mut engine, &mut req);

  let mut first = content_block(&req, req.id, 0, true, vec![0; 64]);
  first.opts.set_uint(known::SIZE2, 70_000);
  let msg = engine.parse(peer(), &test::bytes(&first), 0).unwrap();

  assert_eq!(msg.status, Status::EntityTooLarge);
  assert_eq!(engine.blockwise_sent_len(), 0);
  assert_eq!(engine.blockwise_received_len(), 0);
  assert!(engine.platform().tx.is_empty());
}

/// Server side: answer a GET with a 100 byte response, leaving the rest of it stored
fn serve_large_response(engine: &mut Engine<PlatformMock>) -> Message {
  let req = con_get(5);
  engine.parse(peer(), &test::bytes(&req), 0).unwrap();

  let mut rep = Message::new(Type::Ack, code::CONTENT, req.id, req.token);
  rep.payload = Payload(vec![4; 100]);
  build(engine, &mut rep);
  assert_eq!(engine.blockwise_sent_len(), 1);
  req
}

#[test]
fn block2_request_past_the_end_is_ignored() {
  let mut engine = blockwise_engine(64);
  let req = serve_large_response(&mut engine);

  let mut past = con_get(6);
  past.token = req.token;
  past.opts.set_block2(Block::new(64, 5, false));
  let msg = engine.parse(peer(), &test::bytes(&past), 0).unwrap();

  assert_eq!(msg.status, Status::Ok);
  assert!(engine.platform().tx.is_empty());
  assert_eq!(engine.blockwise_sent_len(), 1);

  let mut next = con_get(7);
  next.token = req.token;
  next.opts.set_block2(Block::new(64, 1, false));
  let msg = engine.parse(peer(), &test::bytes(&next), 0).unwrap();

  assert_eq!(msg.status, Status::BlockwiseAck);
  let sent = engine.platform_mut().take_sent();
  assert_eq!(sent[0].data().opts.block2(), Some(Block::new(64, 1, false)));
  assert_eq!(sent[0].data().payload.0.len(), 36);
  assert_eq!(sent[0].data().id, Id(7));
  assert_eq!(engine.blockwise_sent_len(), 0);
}

#[test]
fn reset_abandons_blockwise_response() {
  let mut engine = blockwise_engine(64);
  let req = serve_large_response(&mut engine);

  engine.parse(peer(), &test::bytes(&req.reset()), 0).unwrap();
  assert_eq!(engine.blockwise_sent_len(), 0);
}

#[test]
fn parse_stamps_with_the_last_exec_time() {
  let mut engine = engine();
  engine.exec(Seconds(100)).unwrap();

  engine.parse(peer(), &test::bytes(&con_get(1)), 0).unwrap();

  engine.exec(Seconds(160)).unwrap();
  assert_eq!(engine.duplicate_len(), 1);

  engine.exec(Seconds(161)).unwrap();
  assert_eq!(engine.duplicate_len(), 0);
}
