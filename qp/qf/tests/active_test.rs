//! Active object, pub/sub and time event tests for qp-qf

use qp_qf::{
    QActive, QActiveObject, QDeferQueue, QError, QEventCatalog, QEventStore, QEvt, QEvtFor, QHsm,
    QPayload, QPoolSet, QPriority, QSignal, QStateMachine, QStateReturn, QF, SizeClass,
};

#[derive(Debug, Clone, PartialEq)]
enum Small {
    Value(i32),
}

#[derive(Debug, Clone, PartialEq)]
enum Medium {
    Text([u8; 24]),
}

#[derive(Debug, Clone, PartialEq)]
enum Large {
    Blob([u8; 96]),
}

struct Catalog;

impl QEventCatalog for Catalog {
    type Small = Small;
    type Medium = Medium;
    type Large = Large;
}

type Pools = QPoolSet<Catalog, 4, 2, 1>;
type Qf = QF<Pools>;
type Payload = QPayload<Catalog>;

const READING: QSignal = QSignal(5);
const PING: QSignal = QSignal(40);
const TIMEOUT: QSignal = QSignal(41);
const HOLD: QSignal = QSignal(42);
const RELEASE: QSignal = QSignal(43);
const WORK: QSignal = QSignal(44);

#[derive(Debug, Clone, Copy, PartialEq)]
enum St {
    Open,
    Holding,
}

/// Records every user event it sees; can hold WORK events back.
struct Recorder<'q> {
    qf: &'q Qf,
    prio: QPriority,
    seen: Vec<(QSignal, Payload)>,
    deferred: QDeferQueue<Catalog, 2>,
}

impl<'q> Recorder<'q> {
    fn new(qf: &'q Qf, prio: u8) -> QHsm<Self> {
        QHsm::new(Self {
            qf,
            prio: QPriority::new(prio).unwrap(),
            seen: Vec::new(),
            deferred: QDeferQueue::new(),
        })
    }
}

impl QStateMachine for Recorder<'_> {
    type State = St;
    type Payload = Payload;

    fn initial(&mut self) -> St {
        self.qf.subscribe(self.prio, READING).unwrap();
        St::Open
    }

    fn superstate(&self, _state: St) -> Option<St> {
        None
    }

    fn handle(&mut self, state: St, evt: &QEvt<Payload>) -> QStateReturn<St> {
        match (state, evt.signal()) {
            (_, QSignal::ENTRY) | (_, QSignal::EXIT) | (_, QSignal::INIT) => QStateReturn::Super,
            (St::Open, HOLD) => QStateReturn::Transition(St::Holding),
            (St::Holding, WORK) => {
                self.deferred.defer(evt);
                QStateReturn::Handled
            }
            (St::Holding, RELEASE) => {
                while self.deferred.recall(self.qf, self.prio) {}
                QStateReturn::Transition(St::Open)
            }
            (_, sig) => {
                self.seen.push((sig, evt.payload().clone()));
                QStateReturn::Handled
            }
        }
    }
}

impl QActiveObject for Recorder<'_> {
    fn priority(&self) -> QPriority {
        self.prio
    }
}

/// Drain the framework the way a cooperative scheduler would
fn run(qf: &Qf, aos: &mut [&mut dyn QActive<Pools>]) -> usize {
    let mut n = 0;
    while let Some((prio, r)) = qf.next_ready() {
        let evt: QEvtFor<Pools> = qf.resolve(r).unwrap();
        let ao = aos.iter_mut().find(|a| a.priority() == prio).unwrap();
        ao.dispatch(&evt).unwrap();
        qf.gc(r);
        n += 1;
    }
    n
}

#[test]
fn test_post_delivers_payload_and_frees_block() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    qf.start(&mut a, 4).unwrap();

    qf.post(a.machine().prio, PING, QPayload::Small(Small::Value(7)));
    assert_eq!(qf.pool_stats(SizeClass::Small).in_use, 1);
    assert_eq!(run(&qf, &mut [&mut a]), 1);

    assert_eq!(a.machine().seen, vec![(PING, QPayload::Small(Small::Value(7)))]);
    assert!(qf.pool_stats(SizeClass::Small).is_idle());
}

#[test]
fn test_publish_shares_one_block_between_subscribers() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    let mut b = Recorder::new(&qf, 2);
    qf.start(&mut a, 4).unwrap();
    qf.start(&mut b, 4).unwrap();

    qf.publish(READING, QPayload::Medium(Medium::Text([b'x'; 24])));
    assert_eq!(qf.pool_stats(SizeClass::Medium).in_use, 1);

    let (prio, r) = qf.next_ready().unwrap();
    assert_eq!(prio.raw(), 2);
    assert_eq!(qf.store().ref_count(r), 2);
    qf.gc(r);
    assert_eq!(qf.pool_stats(SizeClass::Medium).in_use, 1);

    let (prio, r) = qf.next_ready().unwrap();
    assert_eq!(prio.raw(), 1);
    qf.gc(r);
    assert!(qf.pool_stats(SizeClass::Medium).is_idle());
}

#[test]
fn test_publish_without_subscribers_frees_immediately() {
    let qf = Qf::default();
    qf.publish(READING, QPayload::Large(Large::Blob([0; 96])));
    assert!(qf.pool_stats(SizeClass::Large).is_idle());
    assert_eq!(qf.pool_stats(SizeClass::Large).peak, 1);
}

#[test]
fn test_higher_priority_drained_first() {
    let qf = Qf::default();
    let mut low = Recorder::new(&qf, 1);
    let mut high = Recorder::new(&qf, 3);
    qf.start(&mut low, 4).unwrap();
    qf.start(&mut high, 4).unwrap();

    qf.post(QPriority::new(1).unwrap(), PING, QPayload::None);
    qf.post(QPriority::new(3).unwrap(), PING, QPayload::None);
    let order: Vec<u8> = std::iter::from_fn(|| qf.next_ready().map(|(p, _)| p.raw())).collect();
    assert_eq!(order, vec![3, 1]);
}

#[test]
fn test_try_post_reports_full_queue_and_releases_event() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    qf.start(&mut a, 1).unwrap();
    let prio = QPriority::new(1).unwrap();

    qf.try_post(prio, PING, QPayload::Small(Small::Value(1))).unwrap();
    assert_eq!(
        qf.try_post(prio, PING, QPayload::Small(Small::Value(2))),
        Err(QError::QueueFull)
    );
    assert_eq!(qf.pool_stats(SizeClass::Small).in_use, 1);
    assert_eq!(qf.queue_min_free(prio), Some(0));
}

#[test]
#[should_panic(expected = "QF::post")]
fn test_post_to_full_queue_is_fatal() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    qf.start(&mut a, 1).unwrap();
    let prio = QPriority::new(1).unwrap();
    qf.post(prio, PING, QPayload::None);
    qf.post(prio, PING, QPayload::None);
}

#[test]
#[should_panic(expected = "event pool exhausted")]
fn test_pool_exhaustion_is_fatal() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    qf.start(&mut a, 4).unwrap();
    let prio = QPriority::new(1).unwrap();
    qf.post(prio, PING, QPayload::Large(Large::Blob([1; 96])));
    qf.post(prio, PING, QPayload::Large(Large::Blob([2; 96])));
}

#[test]
fn test_duplicate_start_rejected() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 2);
    let mut b = Recorder::new(&qf, 2);
    qf.start(&mut a, 4).unwrap();
    assert_eq!(qf.start(&mut b, 4), Err(QError::InvalidPriority));
    assert_eq!(qf.start(&mut Recorder::new(&qf, 3), 0), Err(QError::InvalidSize));
}

#[test]
fn test_time_events_post_to_owner() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    qf.start(&mut a, 4).unwrap();
    let prio = QPriority::new(1).unwrap();

    let one_shot = qf.time_event(prio, TIMEOUT).unwrap();
    qf.arm(one_shot, 2, 0).unwrap();
    qf.tick();
    assert_eq!(qf.queue_len(prio), 0);
    qf.tick();
    assert_eq!(qf.queue_len(prio), 1);
    assert!(!qf.is_armed(one_shot));
    assert_eq!(qf.now().raw(), 2);

    run(&qf, &mut [&mut a]);
    assert_eq!(a.machine().seen, vec![(TIMEOUT, QPayload::None)]);
}

#[test]
fn test_recalled_events_jump_the_queue() {
    let qf = Qf::default();
    let mut a = Recorder::new(&qf, 1);
    qf.start(&mut a, 6).unwrap();
    let prio = QPriority::new(1).unwrap();

    qf.post(prio, HOLD, QPayload::None);
    qf.post(prio, WORK, QPayload::Small(Small::Value(1)));
    qf.post(prio, WORK, QPayload::Small(Small::Value(2)));
    run(&qf, &mut [&mut a]);
    assert!(a.machine().seen.is_empty());
    assert_eq!(a.machine().deferred.len(), 2);
    // Deferred events hold no pool blocks
    assert!(qf.pool_stats(SizeClass::Small).is_idle());

    qf.post(prio, RELEASE, QPayload::None);
    qf.post(prio, PING, QPayload::None);
    run(&qf, &mut [&mut a]);

    // Each recall lands at the head of the queue, ahead of PING and of the
    // previously recalled event
    let seen: Vec<QSignal> = a.machine().seen.iter().map(|(s, _)| *s).collect();
    assert_eq!(seen, vec![WORK, WORK, PING]);
    assert_eq!(a.machine().seen[0].1, QPayload::Small(Small::Value(2)));
}
