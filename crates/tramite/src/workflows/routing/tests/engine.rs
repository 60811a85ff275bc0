use super::common::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use chrono::Duration;

use crate::workflows::error::{CapacityRejection, LifecycleError};
use crate::workflows::offices::{OfficeId, OfficeUpdate};
use crate::workflows::routing::{
    CaseFileId, CaseFileStatus, CaseReopener, MovementReason, MoveRequest, NewCaseFile,
};
use crate::workflows::store::MovementRepository;

#[test]
fn registered_case_files_start_pending_and_unassigned() {
    let h = harness();
    let case_file = h.case_file(" EXP-2025-0001 ");

    assert_eq!(case_file.number, "EXP-2025-0001");
    assert_eq!(case_file.status, CaseFileStatus::Pending);
    assert_eq!(case_file.current_office_id, None);
    assert_eq!(case_file.created_at, start());
    assert!(h.engine.current_office(&case_file.id).unwrap().is_none());
}

#[test]
fn duplicate_or_blank_numbers_are_rejected() {
    let h = harness();
    h.case_file("EXP-1");

    let err = h
        .engine
        .register_case_file(NewCaseFile {
            number: "EXP-1".to_string(),
            company_id: "20100070970".to_string(),
        })
        .expect_err("duplicate number");
    assert!(matches!(err, LifecycleError::Validation { .. }));

    let err = h
        .engine
        .register_case_file(NewCaseFile {
            number: "  ".to_string(),
            company_id: "20100070970".to_string(),
        })
        .expect_err("blank number");
    assert!(matches!(err, LifecycleError::Validation { .. }));
}

#[test]
fn first_move_assigns_office_without_origin() {
    let h = harness();
    let office = h.office("Mesa de Partes", 3);
    let case_file = h.case_file("EXP-1");

    let movement = h
        .engine
        .move_case_file(
            MoveRequest::new(
                case_file.id.clone(),
                office.id.clone(),
                MovementReason::Review,
                user(),
            )
            .with_notes("ingreso")
            .with_documents(["solicitud", "dni", "voucher"], ["solicitud", "dni"]),
        )
        .expect("moved");

    assert_eq!(movement.from_office_id, None);
    assert_eq!(movement.to_office_id, office.id);
    assert_eq!(movement.moved_at, start());
    assert_eq!(movement.pending_documents(), vec!["voucher"]);
    assert_eq!(h.load(&office.id), 1);

    let stored = h.engine.case_file(&case_file.id).unwrap();
    assert_eq!(stored.current_office_id, Some(office.id));
    assert_eq!(stored.status, CaseFileStatus::Pending);
}

#[test]
fn move_transfers_the_slot_between_offices() {
    let h = harness();
    let origin = h.office("Origin", 2);
    let target = h.office("Target", 2);
    let case_file = h.case_file("EXP-1");

    h.move_to(&case_file.id, &origin.id).unwrap();
    h.clock.advance(Duration::hours(1));
    let movement = h.move_to(&case_file.id, &target.id).unwrap();

    assert_eq!(movement.from_office_id, Some(origin.id.clone()));
    assert_eq!(h.load(&origin.id), 0);
    assert_eq!(h.load(&target.id), 1);
}

#[test]
fn full_target_rejects_the_move_and_keeps_counts() {
    let h = harness();
    let office_a = h.office("A", 1);
    let office_b = h.office("B", 1);
    let first = h.case_file("EXP-1");
    let second = h.case_file("EXP-2");

    h.move_to(&first.id, &office_a.id).unwrap();
    assert_eq!(h.load(&office_a.id), 1);

    h.move_to(&first.id, &office_b.id).expect("B has room");
    assert_eq!(h.load(&office_a.id), 0);
    assert_eq!(h.load(&office_b.id), 1);

    let err = h
        .move_to(&second.id, &office_b.id)
        .expect_err("B is full");
    assert!(matches!(
        err,
        LifecycleError::CapacityExceeded {
            reason: CapacityRejection::Full { max_capacity: 1 },
            ..
        }
    ));
    assert_eq!(h.load(&office_b.id), 1);
    assert_eq!(h.engine.case_file(&second.id).unwrap().current_office_id, None);
    assert!(h.engine.flow(&second.id).unwrap().movements.is_empty());
}

#[test]
fn inactive_target_rejects_the_move() {
    let h = harness();
    let office = h.office("Closed", 5);
    h.engine
        .offices()
        .update_office(
            &office.id,
            OfficeUpdate {
                is_active: Some(false),
                ..OfficeUpdate::default()
            },
        )
        .unwrap();
    let case_file = h.case_file("EXP-1");

    let err = h.move_to(&case_file.id, &office.id).expect_err("inactive");
    assert_eq!(err.kind(), "capacity_exceeded");
    assert_eq!(h.load(&office.id), 0);
}

#[test]
fn terminal_case_files_cannot_move() {
    let h = harness();
    let origin = h.office("Origin", 2);
    let target = h.office("Target", 2);
    let case_file = h.case_file("EXP-1");
    h.move_to(&case_file.id, &origin.id).unwrap();

    h.engine
        .transition_status(&case_file.id, CaseFileStatus::InProcess)
        .unwrap();
    h.engine
        .transition_status(&case_file.id, CaseFileStatus::Completed)
        .unwrap();

    let err = h
        .move_to(&case_file.id, &target.id)
        .expect_err("terminal status");
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
    assert_eq!(h.store.movements_for(&case_file.id).unwrap().len(), 1);
    assert_eq!(h.load(&origin.id), 1);
    assert_eq!(h.load(&target.id), 0);
}

#[test]
fn moving_into_the_current_office_is_rejected() {
    let h = harness();
    let office = h.office("Same", 3);
    let case_file = h.case_file("EXP-1");
    h.move_to(&case_file.id, &office.id).unwrap();

    let err = h.move_to(&case_file.id, &office.id).expect_err("same office");
    assert!(matches!(err, LifecycleError::Validation { .. }));
    assert_eq!(h.load(&office.id), 1);
}

#[test]
fn unknown_case_file_or_office_is_not_found() {
    let h = harness();
    let office = h.office("Known", 1);
    let case_file = h.case_file("EXP-1");

    let err = h
        .move_to(&CaseFileId("exp-missing".to_string()), &office.id)
        .expect_err("missing case file");
    assert_eq!(err.kind(), "not_found");

    let err = h
        .move_to(&case_file.id, &OfficeId("ofi-missing".to_string()))
        .expect_err("missing office");
    assert_eq!(err.kind(), "not_found");
    assert_eq!(h.load(&office.id), 0);
}

#[test]
fn flow_replays_to_the_current_office() {
    let h = harness();
    let offices = [h.office("Reception", 5), h.office("Legal", 5), h.office("Board", 5)];
    let case_file = h.case_file("EXP-1");

    for office in offices.iter().chain(std::iter::once(&offices[0])) {
        h.clock.advance(Duration::minutes(30));
        h.move_to(&case_file.id, &office.id).unwrap();
    }

    let flow = h.engine.flow(&case_file.id).unwrap();
    assert_eq!(flow.movements.len(), 4);
    assert_eq!(flow.replayed_office(), flow.current_office_id.as_ref());
    assert_eq!(flow.current_office_id, Some(offices[0].id.clone()));
    assert!(flow
        .movements
        .windows(2)
        .all(|pair| pair[0].moved_at <= pair[1].moved_at
            && pair[1].from_office_id.as_ref() == Some(&pair[0].to_office_id)));
}

#[test]
fn office_loads_match_case_files_located_there() {
    let h = harness();
    let reception = h.office("Reception", 10);
    let legal = h.office("Legal", 10);

    for n in 0..6 {
        let case_file = h.case_file(&format!("EXP-{n}"));
        h.move_to(&case_file.id, &reception.id).unwrap();
        if n % 2 == 0 {
            h.move_to(&case_file.id, &legal.id).unwrap();
        }
    }

    for office in [&reception, &legal] {
        let located = h.engine.case_files_in_office(&office.id).unwrap();
        assert_eq!(located.len() as u32, h.load(&office.id));
    }
    assert_eq!(h.load(&reception.id), 3);
}

#[test]
fn status_machine_only_moves_forward() {
    let h = harness();
    let case_file = h.case_file("EXP-1");

    let err = h
        .engine
        .transition_status(&case_file.id, CaseFileStatus::Completed)
        .expect_err("pending cannot complete");
    assert_eq!(err.kind(), "invalid_state");

    h.clock.advance(Duration::days(1));
    let updated = h
        .engine
        .transition_status(&case_file.id, CaseFileStatus::InProcess)
        .unwrap();
    assert_eq!(updated.updated_at, start() + Duration::days(1));

    h.engine
        .transition_status(&case_file.id, CaseFileStatus::Rejected)
        .unwrap();
    let err = h
        .engine
        .transition_status(&case_file.id, CaseFileStatus::InProcess)
        .expect_err("terminal");
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
}

#[test]
fn reopen_forces_processing_and_can_be_reverted() {
    let h = harness();
    let case_file = h.case_file("EXP-1");
    h.engine
        .transition_status(&case_file.id, CaseFileStatus::InProcess)
        .unwrap();
    let completed = h
        .engine
        .transition_status(&case_file.id, CaseFileStatus::Completed)
        .unwrap();

    h.clock.advance(Duration::days(400));
    let receipt = h.engine.reopen(&case_file.id).unwrap();
    assert_eq!(receipt.previous_status, CaseFileStatus::Completed);
    assert_eq!(
        h.engine.case_file(&case_file.id).unwrap().status,
        CaseFileStatus::InProcess
    );

    h.engine.revert_reopen(&receipt).unwrap();
    assert_eq!(h.engine.case_file(&case_file.id).unwrap(), completed);
}

#[test]
fn revert_keeps_a_transition_made_after_the_reopen() {
    let h = harness();
    let case_file = h.case_file("EXP-1");
    h.engine
        .transition_status(&case_file.id, CaseFileStatus::InProcess)
        .unwrap();
    h.engine
        .transition_status(&case_file.id, CaseFileStatus::Completed)
        .unwrap();

    let receipt = h.engine.reopen(&case_file.id).unwrap();
    let rejected = h
        .engine
        .transition_status(&case_file.id, CaseFileStatus::Rejected)
        .unwrap();

    h.engine.revert_reopen(&receipt).unwrap();
    assert_eq!(h.engine.case_file(&case_file.id).unwrap(), rejected);
}

#[test]
fn clock_stepping_back_keeps_the_flow_in_move_order() {
    let h = harness();
    let first = h.office("Reception", 5);
    let second = h.office("Legal", 5);
    let case_file = h.case_file("EXP-1");

    h.clock.advance(Duration::minutes(5));
    let earlier = h.move_to(&case_file.id, &first.id).unwrap();
    h.clock.advance(Duration::seconds(-1));
    let later = h.move_to(&case_file.id, &second.id).unwrap();
    assert_eq!(later.moved_at, earlier.moved_at);

    let flow = h.engine.flow(&case_file.id).unwrap();
    assert_eq!(flow.current_office_id, Some(second.id.clone()));
    assert_eq!(flow.replayed_office(), flow.current_office_id.as_ref());
    assert_eq!(flow.movements.last().unwrap().to_office_id, second.id);
}

#[test]
fn failed_movement_append_rolls_the_move_back() {
    let h = flaky_harness();
    let origin = h.office("Origin", 2);
    let target = h.office("Target", 2);
    let case_file = h.case_file("EXP-1");
    h.move_to(&case_file.id, &origin.id).unwrap();
    let before = h.engine.case_file(&case_file.id).unwrap();

    h.store.fail_movement_appends(true);
    let err = h.move_to(&case_file.id, &target.id).expect_err("log offline");
    assert_eq!(err.kind(), "repository");

    assert_eq!(h.engine.case_file(&case_file.id).unwrap(), before);
    assert_eq!(h.load(&origin.id), 1);
    assert_eq!(h.load(&target.id), 0);
    assert_eq!(h.engine.flow(&case_file.id).unwrap().movements.len(), 1);

    h.store.fail_movement_appends(false);
    h.move_to(&case_file.id, &target.id).expect("recovers");
    assert_eq!(h.load(&target.id), 1);
}

#[test]
fn failed_case_file_update_hands_back_the_reservation() {
    let h = flaky_harness();
    let target = h.office("Target", 1);
    let case_file = h.case_file("EXP-1");

    h.store.fail_case_file_updates(true);
    let err = h.move_to(&case_file.id, &target.id).expect_err("store offline");
    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.load(&target.id), 0);
    assert!(h.engine.flow(&case_file.id).unwrap().movements.is_empty());
}

#[test]
fn concurrent_moves_never_overfill_an_office() {
    let h = harness();
    let target = h.office("Hot", 5);
    let case_files: Vec<CaseFileId> = (0..12)
        .map(|n| h.case_file(&format!("EXP-{n:03}")).id)
        .collect();
    let accepted = AtomicUsize::new(0);

    thread::scope(|scope| {
        for id in &case_files {
            let h = &h;
            let target = &target;
            let accepted = &accepted;
            scope.spawn(move || {
                if h.move_to(id, &target.id).is_ok() {
                    accepted.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(accepted.load(Ordering::SeqCst), 5);
    assert_eq!(h.load(&target.id), 5);
    assert_eq!(h.engine.case_files_in_office(&target.id).unwrap().len(), 5);
}

#[test]
fn concurrent_moves_of_one_case_file_are_serialized() {
    let h = harness();
    let offices: Vec<_> = (0..4).map(|n| h.office(&format!("Office {n}"), 10)).collect();
    let case_file = h.case_file("EXP-1");

    thread::scope(|scope| {
        for office in &offices {
            let h = &h;
            let id = &case_file.id;
            scope.spawn(move || {
                let _ = h.move_to(id, &office.id);
            });
        }
    });

    let total: u32 = offices.iter().map(|office| h.load(&office.id)).sum();
    assert_eq!(total, 1);
    let flow = h.engine.flow(&case_file.id).unwrap();
    assert_eq!(flow.replayed_office(), flow.current_office_id.as_ref());
}
