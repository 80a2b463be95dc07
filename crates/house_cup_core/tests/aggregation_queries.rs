use house_cup_core::{
    AwardService, ConnectionPool, EntityRef, House, NewAward, QueryService, RosterService,
    StoreError, TotalDrift,
};
use std::sync::Arc;

struct League {
    pool: Arc<ConnectionPool>,
    roster: RosterService,
    awards: AwardService,
    queries: QueryService,
}

fn league() -> League {
    let pool = Arc::new(ConnectionPool::in_memory().unwrap());
    League {
        roster: RosterService::try_new(Arc::clone(&pool)).unwrap(),
        awards: AwardService::try_new(Arc::clone(&pool)).unwrap(),
        queries: QueryService::try_new(Arc::clone(&pool)).unwrap(),
        pool,
    }
}

fn give(league: &League, student_id: Option<i64>, house_id: i64, points: i64) {
    league
        .awards
        .award_points(&NewAward {
            student_id,
            house_id,
            points,
            notes: String::new(),
        })
        .unwrap();
}

#[test]
fn listed_awards_sum_to_running_totals() {
    let league = league();
    let tournament = league.roster.create_tournament("Cup", None).unwrap();
    let house = league.roster.create_house(tournament.id, "Gryffindor").unwrap();
    let harry = league.roster.create_student(house.id, "Harry").unwrap();
    let ron = league.roster.create_student(house.id, "Ron").unwrap();

    for (student, points) in [(harry.id, 10), (ron.id, -5), (harry.id, 3), (ron.id, 20)] {
        give(&league, Some(student), house.id, points);
    }
    give(&league, None, house.id, -1);

    for student in [harry.id, ron.id] {
        let listed: i64 = league
            .queries
            .list_awards_for_student(student)
            .unwrap()
            .iter()
            .map(|award| award.points)
            .sum();
        assert_eq!(listed, league.queries.student_total(student).unwrap());
    }

    let ledger = league.queries.house_ledger(house.id).unwrap();
    assert_eq!(ledger.points.len(), 5);
    assert_eq!(ledger.total, 27);
    assert_eq!(ledger.total, league.queries.house_total(house.id).unwrap());
    assert!(league.queries.audit_totals().unwrap().is_empty());
}

#[test]
fn award_listings_keep_insertion_order() {
    let league = league();
    let tournament = league.roster.create_tournament("Cup", None).unwrap();
    let house = league.roster.create_house(tournament.id, "Hufflepuff").unwrap();
    let cedric = league.roster.create_student(house.id, "Cedric").unwrap();

    for points in [5, -2, 9] {
        give(&league, Some(cedric.id), house.id, points);
    }

    let ledger = league.queries.student_ledger(cedric.id).unwrap();
    let deltas: Vec<i64> = ledger.points.iter().map(|award| award.points).collect();
    assert_eq!(deltas, vec![5, -2, 9]);
    assert!(ledger.points.windows(2).all(|pair| pair[0].id < pair[1].id));
    assert_eq!(ledger.total, 12);
}

#[test]
fn standings_order_by_points_then_creation() {
    let league = league();
    let tournament = league.roster.create_tournament("Cup", None).unwrap();
    let gryffindor = league.roster.create_house(tournament.id, "Gryffindor").unwrap();
    let slytherin = league.roster.create_house(tournament.id, "Slytherin").unwrap();
    let ravenclaw = league.roster.create_house(tournament.id, "Ravenclaw").unwrap();

    give(&league, None, slytherin.id, 40);
    give(&league, None, gryffindor.id, 10);
    give(&league, None, ravenclaw.id, 10);

    let order: Vec<i64> = league
        .queries
        .house_standings(tournament.id)
        .unwrap()
        .iter()
        .map(|house| house.id)
        .collect();
    assert_eq!(order, vec![slytherin.id, gryffindor.id, ravenclaw.id]);
}

#[test]
fn scoped_listings_join_through_parents() {
    let league = league();
    let cup = league.roster.create_tournament("Cup", None).unwrap();
    let other_cup = league.roster.create_tournament("Other", None).unwrap();
    let lions = league.roster.create_house(cup.id, "Lions").unwrap();
    let badgers = league.roster.create_house(cup.id, "Badgers").unwrap();
    let elsewhere = league.roster.create_house(other_cup.id, "Elsewhere").unwrap();

    let a = league.roster.create_student(lions.id, "A").unwrap();
    let b = league.roster.create_student(badgers.id, "B").unwrap();
    league.roster.create_student(elsewhere.id, "C").unwrap();

    let houses: Vec<House> = league.queries.list_houses_for_tournament(cup.id).unwrap();
    assert_eq!(houses, vec![lions.clone(), badgers.clone()]);

    let students = league.queries.list_students_for_tournament(cup.id).unwrap();
    let ids: Vec<i64> = students.iter().map(|student| student.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);

    assert_eq!(
        league.queries.list_students_for_house(badgers.id).unwrap(),
        vec![b]
    );
}

#[test]
fn scoped_reads_of_missing_parents_are_not_found() {
    let league = league();
    assert!(matches!(
        league.queries.house_total(3),
        Err(StoreError::NotFound(EntityRef::House(3)))
    ));
    assert!(matches!(
        league.queries.list_awards_for_student(3),
        Err(StoreError::NotFound(EntityRef::Student(3)))
    ));
    assert!(matches!(
        league.queries.list_awards_for_house(3),
        Err(StoreError::NotFound(EntityRef::House(3)))
    ));
    assert!(matches!(
        league.queries.list_houses_for_tournament(3),
        Err(StoreError::NotFound(EntityRef::Tournament(3)))
    ));
    assert!(matches!(
        league.queries.house_standings(3),
        Err(StoreError::NotFound(EntityRef::Tournament(3)))
    ));
    assert!(matches!(
        league.queries.list_students_for_house(3),
        Err(StoreError::NotFound(EntityRef::House(3)))
    ));
}

#[test]
fn empty_parents_list_nothing() {
    let league = league();
    let tournament = league.roster.create_tournament("Cup", None).unwrap();
    let house = league.roster.create_house(tournament.id, "Empty").unwrap();

    assert!(league.queries.list_students_for_house(house.id).unwrap().is_empty());
    assert!(league.queries.list_awards_for_house(house.id).unwrap().is_empty());
    assert_eq!(league.queries.house_ledger(house.id).unwrap().total, 0);
}

#[test]
fn audit_reports_totals_edited_outside_the_coordinator() {
    let league = league();
    let tournament = league.roster.create_tournament("Cup", None).unwrap();
    let house = league.roster.create_house(tournament.id, "Gryffindor").unwrap();
    let student = league.roster.create_student(house.id, "Fred").unwrap();
    give(&league, Some(student.id), house.id, 12);

    {
        let conn = league.pool.get().unwrap();
        conn.execute(
            "UPDATE students SET points = 100 WHERE id = ?1;",
            [student.id],
        )
        .unwrap();
    }

    let drifts = league.queries.audit_totals().unwrap();
    assert_eq!(
        drifts,
        vec![TotalDrift {
            entity: EntityRef::Student(student.id),
            recorded: 100,
            ledger: 12,
        }]
    );

    let json = serde_json::to_value(&drifts[0]).unwrap();
    assert_eq!(json["entity"]["entity"], "student");
    assert_eq!(json["entity"]["id"], student.id);
}
