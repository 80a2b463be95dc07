use house_cup_core::{
    AwardService, ConnectionPool, EntityRef, HouseContribution, NewAward, QueryService,
    RosterService, StoreError,
};
use std::sync::Arc;

struct Cup {
    pool: Arc<ConnectionPool>,
    awards: AwardService,
    queries: QueryService,
    house_id: i64,
    student_id: i64,
}

fn cup() -> Cup {
    let pool = Arc::new(ConnectionPool::in_memory().unwrap());
    let roster = RosterService::try_new(Arc::clone(&pool)).unwrap();
    let tournament = roster.create_tournament("T1", None).unwrap();
    let house = roster.create_house(tournament.id, "H1").unwrap();
    let student = roster.create_student(house.id, "A").unwrap();
    Cup {
        awards: AwardService::try_new(Arc::clone(&pool)).unwrap(),
        queries: QueryService::try_new(Arc::clone(&pool)).unwrap(),
        pool,
        house_id: house.id,
        student_id: student.id,
    }
}

fn award(student_id: Option<i64>, house_id: i64, points: i64) -> NewAward {
    NewAward {
        student_id,
        house_id,
        points,
        notes: format!("delta {points}"),
    }
}

#[test]
fn award_then_penalty_then_removal() {
    let cup = cup();

    let first = cup
        .awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 10))
        .unwrap();
    assert_eq!(first.points, 10);
    assert_eq!(first.student_id, Some(cup.student_id));
    assert_eq!(first.notes, "delta 10");
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 10);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 10);

    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, -3))
        .unwrap();
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 7);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 7);

    let removal = cup.awards.remove_student(cup.student_id).unwrap();
    assert_eq!(removal.student.points, 7);
    assert_eq!(removal.removed_awards, 2);
    assert_eq!(
        removal.house_adjustments,
        vec![HouseContribution {
            house_id: cup.house_id,
            points: 7
        }]
    );

    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 0);
    assert!(matches!(
        cup.queries.student_total(cup.student_id),
        Err(StoreError::NotFound(EntityRef::Student(_)))
    ));
    assert!(cup.queries.list_awards().unwrap().is_empty());
}

#[test]
fn missing_references_are_constraint_violations_and_write_nothing() {
    let cup = cup();

    let err = cup
        .awards
        .award_points(&award(Some(cup.student_id), cup.house_id + 9, 5))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    let err = cup
        .awards
        .award_points(&award(Some(cup.student_id + 9), cup.house_id, 5))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 0);
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 0);
    assert!(cup.queries.list_awards().unwrap().is_empty());
}

#[test]
fn award_for_student_of_another_house_is_rejected() {
    let cup = cup();
    let roster = RosterService::try_new(Arc::clone(&cup.pool)).unwrap();
    let house = roster.get_house(cup.house_id).unwrap();
    let other = roster.create_house(house.tournament_id, "H2").unwrap();

    let err = cup
        .awards
        .award_points(&award(Some(cup.student_id), other.id, 5))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
    assert_eq!(cup.queries.house_total(other.id).unwrap(), 0);
}

#[test]
fn house_only_award_moves_house_total_only() {
    let cup = cup();

    let created = cup
        .awards
        .award_points(&award(None, cup.house_id, 25))
        .unwrap();
    assert_eq!(created.student_id, None);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 25);
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 0);

    let ledger = cup.queries.house_ledger(cup.house_id).unwrap();
    assert_eq!(ledger.total, 25);
    assert_eq!(ledger.points, vec![created]);

    // Removing the student leaves house-only awards alone.
    let removal = cup.awards.remove_student(cup.student_id).unwrap();
    assert_eq!(removal.removed_awards, 0);
    assert!(removal.house_adjustments.is_empty());
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 25);
}

#[test]
fn zero_point_award_is_recorded() {
    let cup = cup();
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 0))
        .unwrap();
    assert_eq!(cup.queries.list_awards().unwrap().len(), 1);
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 0);
}

#[test]
fn non_positive_ids_are_malformed() {
    let cup = cup();
    assert!(matches!(
        cup.awards.award_points(&award(None, 0, 1)),
        Err(StoreError::MalformedInput(_))
    ));
    assert!(matches!(
        cup.awards.award_points(&award(Some(-4), cup.house_id, 1)),
        Err(StoreError::MalformedInput(_))
    ));
    assert!(matches!(
        cup.awards.remove_student(0),
        Err(StoreError::MalformedInput(_))
    ));
}

#[test]
fn overflowing_total_is_rejected() {
    let cup = cup();
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, i64::MAX))
        .unwrap();

    let err = cup
        .awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 1))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), i64::MAX);
    assert_eq!(cup.queries.list_awards().unwrap().len(), 1);
}

#[test]
fn removing_student_with_minimum_award_is_rejected_unchanged() {
    let cup = cup();
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, i64::MIN))
        .unwrap();

    let err = cup.awards.remove_student(cup.student_id).unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), i64::MIN);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), i64::MIN);
    assert_eq!(cup.queries.list_awards().unwrap().len(), 1);
    assert!(cup.queries.audit_totals().unwrap().is_empty());
}

#[test]
fn removal_that_would_overflow_house_total_is_rejected_unchanged() {
    let cup = cup();
    let roster = RosterService::try_new(Arc::clone(&cup.pool)).unwrap();
    let second = roster.create_student(cup.house_id, "B").unwrap();
    let third = roster.create_student(cup.house_id, "C").unwrap();

    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, -10))
        .unwrap();
    cup.awards
        .award_points(&award(Some(second.id), cup.house_id, i64::MAX))
        .unwrap();
    cup.awards
        .award_points(&award(Some(third.id), cup.house_id, 5))
        .unwrap();
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), i64::MAX - 5);

    let err = cup.awards.remove_student(cup.student_id).unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), i64::MAX - 5);
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), -10);
    assert_eq!(cup.queries.list_awards().unwrap().len(), 3);
    assert!(cup.queries.audit_totals().unwrap().is_empty());

    // Taking C's points back first leaves room for A's removal.
    cup.awards.remove_student(third.id).unwrap();
    cup.awards.remove_student(cup.student_id).unwrap();
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), i64::MAX);
    assert!(cup.queries.audit_totals().unwrap().is_empty());
}

#[test]
fn out_of_range_ledger_is_reported_not_panicked() {
    let cup = cup();
    {
        let conn = cup.pool.get().unwrap();
        for _ in 0..2 {
            conn.execute(
                "INSERT INTO point_awards (points, notes, student_id, house_id)
                 VALUES (?1, '', NULL, ?2);",
                rusqlite::params![i64::MAX, cup.house_id],
            )
            .unwrap();
        }
    }

    let err = cup.queries.house_ledger(cup.house_id).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
    assert_eq!(cup.queries.list_awards_for_house(cup.house_id).unwrap().len(), 2);

    let drifts = cup.queries.audit_totals().unwrap();
    assert_eq!(drifts.len(), 1);
    assert_eq!(drifts[0].entity, EntityRef::House(cup.house_id));
    assert_eq!(drifts[0].recorded, 0);
    assert_eq!(drifts[0].ledger, 2 * i128::from(i64::MAX));
}

#[test]
fn removing_missing_student_is_not_found() {
    let cup = cup();
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 4))
        .unwrap();

    let err = cup.awards.remove_student(cup.student_id + 1).unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound(EntityRef::Student(id)) if id == cup.student_id + 1
    ));
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 4);
}

#[test]
fn failed_house_update_rolls_back_award_and_student_total() {
    let cup = cup();
    install_trigger(
        &cup.pool,
        "CREATE TRIGGER fail_house_total BEFORE UPDATE OF house_points ON houses
         BEGIN SELECT RAISE(ABORT, 'simulated house update failure'); END;",
    );

    let err = cup
        .awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 10))
        .unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    assert!(cup.queries.list_awards().unwrap().is_empty());
    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 0);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 0);

    install_trigger(&cup.pool, "DROP TRIGGER fail_house_total;");
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 10))
        .unwrap();
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 10);
}

#[test]
fn failed_student_delete_rolls_back_whole_removal() {
    let cup = cup();
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 6))
        .unwrap();
    install_trigger(
        &cup.pool,
        "CREATE TRIGGER fail_student_delete BEFORE DELETE ON students
         BEGIN SELECT RAISE(ABORT, 'simulated delete failure'); END;",
    );

    assert!(cup.awards.remove_student(cup.student_id).is_err());

    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 6);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 6);
    assert_eq!(
        cup.queries
            .list_awards_for_student(cup.student_id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn failed_house_decrement_rolls_back_whole_removal() {
    let cup = cup();
    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 6))
        .unwrap();
    install_trigger(
        &cup.pool,
        "CREATE TRIGGER fail_house_total BEFORE UPDATE OF house_points ON houses
         BEGIN SELECT RAISE(ABORT, 'simulated house update failure'); END;",
    );

    assert!(cup.awards.remove_student(cup.student_id).is_err());

    assert_eq!(cup.queries.student_total(cup.student_id).unwrap(), 6);
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 6);
    assert_eq!(cup.queries.list_awards().unwrap().len(), 1);
    assert!(cup.queries.audit_totals().unwrap().is_empty());
}

#[test]
fn removal_only_touches_the_removed_students_points() {
    let cup = cup();
    let roster = RosterService::try_new(Arc::clone(&cup.pool)).unwrap();
    let classmate = roster.create_student(cup.house_id, "B").unwrap();

    cup.awards
        .award_points(&award(Some(cup.student_id), cup.house_id, 8))
        .unwrap();
    cup.awards
        .award_points(&award(Some(classmate.id), cup.house_id, 5))
        .unwrap();
    cup.awards
        .award_points(&award(None, cup.house_id, 2))
        .unwrap();
    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 15);

    cup.awards.remove_student(cup.student_id).unwrap();

    assert_eq!(cup.queries.house_total(cup.house_id).unwrap(), 7);
    assert_eq!(cup.queries.student_total(classmate.id).unwrap(), 5);
    assert_eq!(cup.queries.list_awards().unwrap().len(), 2);
    assert!(cup.queries.audit_totals().unwrap().is_empty());
}

fn install_trigger(pool: &ConnectionPool, sql: &str) {
    let conn = pool.get().unwrap();
    conn.execute_batch(sql).unwrap();
}
