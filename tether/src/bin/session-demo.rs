//! A scripted session: a worker thread owns a toy game, and the "UI" makes calls into it while pretending the player
//! is typing. Run with `RUST_LOG=debug` to watch the calls come and go.

use std::{cell::RefCell, rc::Rc, thread, time::Duration};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::{info, warn};

use tether::{
    io::{backends::NopSystem, Action, ActionSink, Key},
    ui::{Interrupt, Root, Widget},
    Downlink, Request, RequestReceiver, RequestThread, SlaveObject, SlaveRequestSender,
};

struct Session {
    turn: u32,
    gold: i64,
    rng: SmallRng,
}

/// Ends the turn, which takes a while: every step is a little simulated server round trip.
struct EndTurn {
    steps: usize,
    interrupt: Interrupt,
    income: Option<i64>,
    interrupted: bool,
}

impl EndTurn {
    fn new(steps: usize, interrupt: Interrupt) -> Self {
        Self {
            steps,
            interrupt,
            income: None,
            interrupted: false,
        }
    }
}

impl Request<Session> for EndTurn {
    fn handle(&mut self, session: &mut Session) {
        let mut income = 0;
        for _ in 0..self.steps {
            if self.interrupt.is_raised() {
                self.interrupted = true;
                return;
            }
            income += session.rng.gen_range(1..=10);
            thread::sleep(Duration::from_millis(session.rng.gen_range(1..4)));
        }
        session.turn += 1;
        session.gold += income;
        self.income = Some(income);
    }
}

/// One dialog's private bookkeeping, kept next to the session.
struct Ledger {
    opened_on: u32,
    entries: usize,
}

impl SlaveObject<Session> for Ledger {
    fn init(&mut self, session: &mut Session) {
        info!(turn = session.turn, "ledger opened");
    }

    fn done(&mut self, session: &mut Session) {
        info!(
            entries = self.entries,
            turns = session.turn - self.opened_on,
            "ledger closed"
        );
    }
}

/// Stands in for the game view under the busy indicator.
#[derive(Default)]
struct Map {
    typed: Vec<Action>,
}

impl Widget for Map {
    fn handle_action(&mut self, action: &Action) -> bool {
        self.typed.push(action.clone());
        true
    }
}

fn press(key: Key) -> Action {
    Action::KeyPress { key }
}

fn main() -> tether::Result<()> {
    tether::trace_init();

    let worker = RequestThread::new("session")?;
    let session = RequestReceiver::new(
        worker.dispatcher(),
        Session {
            turn: 1,
            gold: 100,
            rng: SmallRng::from_entropy(),
        },
    );
    let root = Root::new(Box::new(NopSystem::new()?))?;
    let map = Rc::new(RefCell::new(Map::default()));
    root.push(map.clone());
    let dl = Downlink::new(&root);
    let player = root.input_sink();

    // the player keeps typing while the turn ends
    for c in "move".chars() {
        player.send(press(Key::Char(c)));
    }
    match dl.call(&session.sender(), EndTurn::new(20, dl.interrupt())) {
        Some(end) => info!(income = ?end.income, "turn ended"),
        None => warn!("couldn't end the turn"),
    }
    while map.borrow().typed.len() < 4 {
        root.handle_event();
    }
    info!(keys = map.borrow().typed.len(), "typing replayed to the map");

    // a turn that takes too long, which the player gives up on
    player.send(press(Key::LeftCtrl));
    player.send(press(Key::Pause));
    if let Some(end) = dl.call(&session.sender(), EndTurn::new(10_000, dl.interrupt())) {
        info!(
            interrupted = end.interrupted,
            raised = dl.interrupt().count(),
            "long turn returned"
        );
    }

    let gold = dl.query(&session.sender(), |s: &mut Session| s.gold);
    info!(?gold, "treasury");

    let ledger = SlaveRequestSender::new(session.sender(), |s: &mut Session| Ledger {
        opened_on: s.turn,
        entries: 0,
    });
    for _ in 0..3 {
        dl.call(&ledger, |s: &mut Session, l: &mut Ledger| {
            l.entries += 1;
            s.gold -= 5;
        });
    }
    drop(ledger);
    let end = dl.call(&session.sender(), EndTurn::new(5, dl.interrupt()));
    info!(ended = end.is_some(), "turn ended after bookkeeping");

    // a dialog holding on to a sender after the session's been closed
    let stale = session.sender();
    drop(session);
    let late = dl.call(&stale, |s: &mut Session| s.turn += 1);
    info!(handled = late.is_some(), "call after the session closed");

    drop(worker);
    Ok(())
}
