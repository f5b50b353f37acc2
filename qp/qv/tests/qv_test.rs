//! Scheduler tests for qp-qv

use qp_core::{QError, QEvt, QPriority, QSignal, QStateReturn};
use qp_mem::{QEventCatalog, QPayload, QPoolSet, SizeClass};
use qp_qep::{QHsm, QStateMachine};
use qp_qf::{QActive, QActiveObject, QF};
use qp_qv::QV;

struct Catalog;

impl QEventCatalog for Catalog {
    type Small = u32;
    type Medium = [u32; 4];
    type Large = [u32; 16];
}

type Pools = QPoolSet<Catalog, 4, 2, 1>;
type Payload = QPayload<Catalog>;

const NEXT: QSignal = QSignal(10);

/// Counts down, posting NEXT to a peer on every step
struct Relay<'q> {
    qf: &'q QF<Pools>,
    me: QPriority,
    peer: QPriority,
    log: &'q std::cell::RefCell<Vec<(u8, u32)>>,
}

impl QStateMachine for Relay<'_> {
    type State = ();
    type Payload = Payload;

    fn initial(&mut self) {}

    fn superstate(&self, _state: ()) -> Option<()> {
        None
    }

    fn handle(&mut self, _state: (), evt: &QEvt<Payload>) -> QStateReturn<()> {
        if evt.signal() != NEXT {
            return QStateReturn::Super;
        }
        let n = evt.payload().small().copied().unwrap_or(0);
        self.log.borrow_mut().push((self.me.raw(), n));
        if n > 0 {
            self.qf.post(self.peer, NEXT, QPayload::Small(n - 1));
        }
        QStateReturn::Handled
    }
}

impl QActiveObject for Relay<'_> {
    fn priority(&self) -> QPriority {
        self.me
    }
}

#[test]
fn test_run_until_idle_ping_pongs_to_completion() {
    let qf = QF::new(Pools::new());
    let log = std::cell::RefCell::new(Vec::new());
    let p1 = QPriority::new(1).unwrap();
    let p2 = QPriority::new(2).unwrap();
    let mut a = QHsm::new(Relay { qf: &qf, me: p1, peer: p2, log: &log });
    let mut b = QHsm::new(Relay { qf: &qf, me: p2, peer: p1, log: &log });
    qf.start(&mut a, 2).unwrap();
    qf.start(&mut b, 2).unwrap();

    qf.post(p1, NEXT, QPayload::Small(3));
    let qv = QV::new(&qf);
    assert_eq!(qv.run_until_idle(&mut [&mut a, &mut b]), Ok(4));
    assert_eq!(*log.borrow(), vec![(1, 3), (2, 2), (1, 1), (2, 0)]);
    assert!(qf.pool_stats(SizeClass::Small).is_idle());
    assert_eq!(qv.dispatch_once(&mut [&mut a, &mut b]), Ok(false));
}

#[test]
fn test_event_for_missing_object_is_released() {
    let qf = QF::new(Pools::new());
    let log = std::cell::RefCell::new(Vec::new());
    let p1 = QPriority::new(1).unwrap();
    let mut a = QHsm::new(Relay { qf: &qf, me: p1, peer: p1, log: &log });
    qf.start(&mut a, 2).unwrap();
    qf.post(p1, NEXT, QPayload::Small(0));

    let qv = QV::new(&qf);
    let mut nobody: [&mut dyn QActive<Pools>; 0] = [];
    assert_eq!(qv.dispatch_once(&mut nobody), Err(QError::InvalidPriority));
    assert!(qf.pool_stats(SizeClass::Small).is_idle());
}

#[test]
fn test_running_flag() {
    let qf = QF::new(Pools::new());
    let qv = QV::new(&qf);
    assert!(!qv.is_running());
    qv.stop();
    assert!(!qv.is_running());
}
