use std::cell::RefCell;
use std::rc::Rc;

use nvmflash::config::Registry;
use nvmflash::flashing::{FlashError, FlashOperation, FlashOptions, FlashProgress, ProgressEvent};
use nvmflash::{DebugProbeError, Error, FakeTarget, Operation, Session};
use pretty_assertions::assert_eq;
use test_case::test_case;
use tracing_subscriber::EnvFilter;

const PACIDR: u64 = 0x0010_0044;
const FLASHLOCK: u64 = 0x4002_0000;
const FLASHSTATUS: u64 = 0x4002_0004;
const FLASHPAGE: u64 = 0x4002_0008;
const FLASHPERASE: u64 = 0x4002_0014;

const UNLOCK: u32 = 0xaaaa_aaaa;
const ERASE_START: u32 = 0xa5a5_5a5a;

fn init_logging() {
    // Several tests share the process, only the first one installs the subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fake_pac5223() -> FakeTarget {
    init_logging();
    let registry = Registry::from_builtin_families();
    let family = registry.get_family("PAC52xx").unwrap();
    FakeTarget::from_family(family, "PAC5223").unwrap()
}

/// Returns a detected session and a handle on the simulated target.
fn detected_session(fake: FakeTarget) -> (Session, FakeTarget) {
    let registry = Registry::from_builtin_families();
    let mut session = Session::new(fake.clone());
    assert!(session.auto_detect(&registry).unwrap());
    session.set_flash_options(FlashOptions {
        poll_interval_ms: 0,
        ..Default::default()
    });
    fake.clear_operations();
    (session, fake)
}

#[test_case(0xff00_5223, true; "PAC5223 signature")]
#[test_case(0xff7f_5223, true; "revision bits are masked")]
#[test_case(0xff00_5224, false; "other device")]
#[test_case(0x7f00_5223, false; "high byte differs")]
fn detect_by_identification_register(id: u32, detected: bool) {
    let registry = Registry::from_builtin_families();
    let fake = fake_pac5223().with_id_value(id);
    let mut session = Session::new(fake.clone());

    assert_eq!(session.auto_detect(&registry).unwrap(), detected);
    assert_eq!(session.target().is_some(), detected);
    assert_eq!(
        fake.operations(),
        vec![Operation::Read32 {
            address: PACIDR,
            value: id
        }]
    );
}

#[test]
fn detection_reports_transport_failure() {
    let registry = Registry::from_builtin_families();
    let fake = fake_pac5223();
    fake.disconnect();
    let mut session = Session::new(fake);

    let error = session.auto_detect(&registry).unwrap_err();

    assert!(error.is_transport_error());
    assert!(session.target().is_none());
}

#[test]
fn erase_single_page() {
    let (mut session, fake) = detected_session(fake_pac5223());

    session.flash(0).unwrap().erase(0, 1024).unwrap();

    assert_eq!(
        fake.operations(),
        vec![
            Operation::Write32 {
                address: FLASHPAGE,
                value: 0
            },
            Operation::Write32 {
                address: FLASHPERASE,
                value: ERASE_START
            },
            Operation::Read32 {
                address: FLASHSTATUS,
                value: 0
            },
        ]
    );
    assert_eq!(fake.peek(0, 1024), Some(vec![0xff; 1024]));
    assert_eq!(fake.peek(1024, 2), Some(vec![0x00, 0x00]));
}

#[test]
fn erase_selects_every_page_in_turn() {
    let (mut session, fake) = detected_session(fake_pac5223().with_erase_busy_reads(2));

    session.flash(0).unwrap().erase(0x7_f400, 3 * 1024).unwrap();

    let selected: Vec<u32> = fake
        .writes()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Write32 {
                address: FLASHPAGE,
                value,
            } => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(selected, vec![0x1fd, 0x1fe, 0x1ff]);

    let triggers = fake
        .writes()
        .into_iter()
        .filter(|op| {
            *op == Operation::Write32 {
                address: FLASHPERASE,
                value: ERASE_START,
            }
        })
        .count();
    assert_eq!(triggers, 3);

    // Status reads following each erase command, one poll loop per page.
    let mut polls: Vec<Vec<u32>> = Vec::new();
    for op in fake.operations() {
        match op {
            Operation::Write32 {
                address: FLASHPERASE,
                ..
            } => polls.push(Vec::new()),
            Operation::Read32 {
                address: FLASHSTATUS,
                value,
            } => polls.last_mut().unwrap().push(value),
            _ => {}
        }
    }
    assert_eq!(polls, vec![vec![0x2, 0x2, 0x0]; 3]);

    assert_eq!(fake.peek(0x7_f400, 3 * 1024), Some(vec![0xff; 3 * 1024]));
}

#[test]
fn erase_is_idempotent() {
    let (mut session, fake) = detected_session(fake_pac5223());
    let mut flash = session.flash(0).unwrap();

    flash.erase(0x400, 0x800).unwrap();
    let first = fake.peek(0x400, 0x800);
    flash.erase(0x400, 0x800).unwrap();

    assert_eq!(fake.peek(0x400, 0x800), first);
}

#[test]
fn erase_all_covers_the_region() {
    let (mut session, fake) = detected_session(fake_pac5223());

    session.flash(0).unwrap().erase_all().unwrap();

    let triggers = fake
        .writes()
        .iter()
        .filter(|op| matches!(op, Operation::Write32 { address: FLASHPERASE, .. }))
        .count();
    assert_eq!(triggers, 512);
    assert_eq!(fake.peek(0, 0x8_0000), Some(vec![0xff; 0x8_0000]));
}

#[test]
fn erase_times_out_when_status_never_clears() {
    let (mut session, fake) = detected_session(fake_pac5223().with_stuck_busy());
    session.set_flash_options(FlashOptions {
        erase_timeout_ms: Some(5),
        poll_interval_ms: 0,
        ..Default::default()
    });

    let error = session.flash(0).unwrap().erase(0x400, 0x800).unwrap_err();

    assert!(matches!(
        error,
        FlashError::Timeout {
            operation: FlashOperation::Erase,
            address: 0x400,
            ..
        }
    ));
    assert!(!error.is_transport_error());
    // The second page was never started.
    assert!(!fake.writes().contains(&Operation::Write32 {
        address: FLASHPAGE,
        value: 2
    }));
}

#[test]
fn program_two_halfwords() {
    let (mut session, fake) = detected_session(fake_pac5223());
    let mut flash = session.flash(0).unwrap();
    flash.erase(0, 1024).unwrap();
    fake.clear_operations();

    flash.program(0x100, &[0x11, 0x22, 0x33, 0x44]).unwrap();

    assert_eq!(
        fake.writes(),
        vec![
            Operation::Write32 {
                address: FLASHLOCK,
                value: UNLOCK
            },
            Operation::Write16 {
                address: 0x100,
                value: 0x2211
            },
            Operation::Write16 {
                address: 0x102,
                value: 0x4433
            },
            Operation::Write32 {
                address: FLASHLOCK,
                value: 0
            },
        ]
    );
    assert_eq!(fake.peek(0x100, 4), Some(vec![0x11, 0x22, 0x33, 0x44]));
    assert!(!fake.is_unlocked());
}

#[test]
fn program_without_waiting_for_writes() {
    let (mut session, fake) = detected_session(fake_pac5223());
    session.set_flash_options(FlashOptions {
        wait_for_write: false,
        ..Default::default()
    });

    session.flash(0).unwrap().program(0x200, &[0; 8]).unwrap();

    assert!(!fake
        .operations()
        .iter()
        .any(|op| matches!(op, Operation::Read32 { address: FLASHSTATUS, .. })));
}

#[test]
fn erase_then_program_round_trip() {
    let (mut session, _fake) = detected_session(fake_pac5223());
    let data: Vec<u8> = (0..=255).cycle().take(0x600).collect();
    let mut flash = session.flash(0).unwrap();

    flash.erase(0x1000, 0x800).unwrap();
    flash.program(0x1000, &data).unwrap();

    let mut read_back = vec![0; data.len()];
    flash.read(0x1000, &mut read_back).unwrap();
    assert_eq!(read_back, data);

    let mut tail = vec![0; 0x200];
    flash.read(0x1600, &mut tail).unwrap();
    assert_eq!(tail, vec![0xff; 0x200]);
}

#[test]
fn failing_halfword_still_locks() {
    let (mut session, fake) = detected_session(fake_pac5223().fail_halfword_write(1));

    let error = session
        .flash(0)
        .unwrap()
        .program(0x100, &[1, 2, 3, 4, 5, 6])
        .unwrap_err();

    assert!(matches!(
        error,
        FlashError::Memory {
            operation: FlashOperation::Program,
            address: 0x102,
            source: Error::Probe(DebugProbeError::TransferFailed { .. }),
        }
    ));
    assert!(error.is_transport_error());
    assert_eq!(
        fake.writes().last(),
        Some(&Operation::Write32 {
            address: FLASHLOCK,
            value: 0
        })
    );
    assert!(!fake.is_unlocked());
}

#[test_case(0x101, 2; "odd address")]
#[test_case(0x100, 3; "odd length")]
fn misaligned_program_touches_nothing(address: u64, length: usize) {
    let (mut session, fake) = detected_session(fake_pac5223());

    let error = session
        .flash(0)
        .unwrap()
        .program(address, &vec![0; length])
        .unwrap_err();

    assert!(matches!(
        error,
        FlashError::NotAligned {
            operation: FlashOperation::Program,
            alignment: 2,
            ..
        }
    ));
    assert!(fake.operations().is_empty());
}

#[test_case(0x200, 0x400; "address inside a page")]
#[test_case(0x400, 0x100; "partial page")]
fn misaligned_erase_touches_nothing(address: u64, length: u64) {
    let (mut session, fake) = detected_session(fake_pac5223());

    let error = session.flash(0).unwrap().erase(address, length).unwrap_err();

    assert!(matches!(
        error,
        FlashError::NotAligned {
            operation: FlashOperation::Erase,
            alignment: 0x400,
            ..
        }
    ));
    assert!(fake.operations().is_empty());
}

#[test]
fn out_of_region_requests_touch_nothing() {
    let (mut session, fake) = detected_session(fake_pac5223());
    let mut flash = session.flash(0).unwrap();

    assert!(matches!(
        flash.erase(0x7_fc00, 0x800),
        Err(FlashError::AddressNotInRegion {
            address: 0x7_fc00,
            length: 0x800,
            ..
        })
    ));
    assert!(matches!(
        flash.program(0x7_fffe, &[0; 4]),
        Err(FlashError::AddressNotInRegion { .. })
    ));
    assert!(matches!(
        flash.read(0x8_0000, &mut [0; 4]),
        Err(FlashError::AddressNotInRegion { .. })
    ));
    assert!(fake.operations().is_empty());
}

#[test]
fn empty_requests_are_no_ops() {
    let (mut session, fake) = detected_session(fake_pac5223());
    let mut flash = session.flash(0).unwrap();

    flash.erase(0x400, 0).unwrap();
    flash.program(0x400, &[]).unwrap();

    assert!(fake.operations().is_empty());
}

#[test]
fn disconnect_is_a_transport_error() {
    let (mut session, fake) = detected_session(fake_pac5223());
    fake.disconnect();

    let error = session.flash(0).unwrap().erase(0, 0x400).unwrap_err();

    assert!(error.is_transport_error());
    assert_eq!(error.address(), Some(0));
}

#[test]
fn progress_events() {
    let (mut session, _fake) = detected_session(fake_pac5223());
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    let progress = FlashProgress::new(move |event| sink.borrow_mut().push(event));

    let mut flash = session.flash(0).unwrap().with_progress(&progress);
    flash.erase(0x800, 0x800).unwrap();
    flash.program(0x800, &[0xaa, 0x55]).unwrap();

    let kinds: Vec<&str> = events
        .borrow()
        .iter()
        .map(|event| match event {
            ProgressEvent::StartedErasing { pages: 2 } => "started erasing 2",
            ProgressEvent::SectorErased { address: 0x800, .. } => "erased 0x800",
            ProgressEvent::SectorErased { address: 0xc00, .. } => "erased 0xc00",
            ProgressEvent::FinishedErasing => "finished erasing",
            ProgressEvent::StartedProgramming { length: 2 } => "started programming 2",
            ProgressEvent::DataProgrammed { size: 2, .. } => "programmed 2",
            ProgressEvent::FinishedProgramming => "finished programming",
            _ => "unexpected",
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            "started erasing 2",
            "erased 0x800",
            "erased 0xc00",
            "finished erasing",
            "started programming 2",
            "programmed 2",
            "finished programming",
        ]
    );
}

#[test]
fn failed_erase_reports_progress_failure() {
    let (mut session, _fake) = detected_session(fake_pac5223().with_stuck_busy());
    session.set_flash_options(FlashOptions {
        erase_timeout_ms: Some(1),
        poll_interval_ms: 0,
        ..Default::default()
    });
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    let progress = FlashProgress::new(move |event| sink.borrow_mut().push(event));

    let result = session
        .flash(0)
        .unwrap()
        .with_progress(&progress)
        .erase(0, 0x400);

    assert!(result.is_err());
    assert_eq!(events.borrow().last(), Some(&ProgressEvent::FailedErasing));
}
