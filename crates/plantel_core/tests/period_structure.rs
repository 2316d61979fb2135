use plantel_core::db::open_db_in_memory;
use plantel_core::{
    EntityKind, Grade, Lapse, ModelValidationError, NodeRef, PeriodRepository, PeriodService,
    RepoError, Section, SqliteGuardianRepository, SqlitePeriodRepository,
    SqliteTeacherRepository, StructureError, StudentEnrollmentRecord,
};
use rusqlite::Connection;

type Service<'conn> = PeriodService<
    SqlitePeriodRepository<'conn>,
    SqliteGuardianRepository<'conn>,
    SqliteTeacherRepository<'conn>,
>;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> Service<'_> {
    PeriodService::new(
        SqlitePeriodRepository::try_new(conn).unwrap(),
        SqliteGuardianRepository::try_new(conn).unwrap(),
        SqliteTeacherRepository::try_new(conn).unwrap(),
    )
}

fn ghost_record() -> StudentEnrollmentRecord {
    StudentEnrollmentRecord {
        school_id: "V-999".to_string(),
        first_name: "Ghost".to_string(),
        last_name: "Student".to_string(),
        grade: "9th".to_string(),
        section: "Q".to_string(),
        teacher_email: None,
    }
}

fn grade_names(grades: &[Grade]) -> Vec<&str> {
    grades.iter().map(|grade| grade.name.as_str()).collect()
}

#[test]
fn create_period_trims_label_and_persists() {
    let conn = setup();
    let service = service(&conn);

    let period = service.create_period("  2025-2026 ").unwrap();
    assert_eq!(period.label, "2025-2026");
    assert!(period.lapses.is_empty());

    let loaded = service.get_period(period.uuid).unwrap();
    assert_eq!(loaded, period);
    assert_eq!(service.list_periods().unwrap().len(), 1);
}

#[test]
fn create_period_rejects_blank_and_repeated_labels() {
    let conn = setup();
    let service = service(&conn);

    let err = service.create_period("   ").unwrap_err();
    assert!(matches!(
        err,
        StructureError::Validation(ModelValidationError::BlankPeriodLabel)
    ));

    service.create_period("2025-2026").unwrap();
    let err = service.create_period("2025-2026").unwrap_err();
    assert!(matches!(
        err,
        StructureError::Repo(RepoError::DuplicateKey { table: "periods", .. })
    ));
    assert_eq!(service.list_periods().unwrap().len(), 1);
}

#[test]
fn add_lapse_rejects_repeated_number() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();

    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let updated = service.add_lapse(period.uuid, Lapse::new(2)).unwrap();
    assert_eq!(updated.lapses.len(), 2);

    let err = service.add_lapse(period.uuid, Lapse::new(1)).unwrap_err();
    match err {
        StructureError::DuplicateEntity(err) => {
            assert_eq!(err.kind, EntityKind::Lapse);
            assert_eq!(err.value, "1");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.get_period(period.uuid).unwrap().lapses.len(), 2);
}

#[test]
fn add_lapse_rejects_number_zero() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();

    let err = service.add_lapse(period.uuid, Lapse::new(0)).unwrap_err();
    assert!(matches!(
        err,
        StructureError::Validation(ModelValidationError::InvalidLapseNumber(0))
    ));
}

#[test]
fn adding_same_grade_twice_keeps_one() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let lapse = NodeRef::Ordinal(1);

    service
        .add_grades(period.uuid, &lapse, vec![Grade::new("3rd")])
        .unwrap();
    let err = service
        .add_grades(period.uuid, &lapse, vec![Grade::new("3rd")])
        .unwrap_err();

    assert!(matches!(
        err,
        StructureError::DuplicateEntity(ref duplicate)
            if duplicate.kind == EntityKind::Grade && duplicate.value == "3rd"
    ));
    let stored = service.get_period(period.uuid).unwrap();
    assert_eq!(stored.lapses[0].grades.len(), 1);
}

#[test]
fn grade_batch_is_all_or_nothing() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let lapse = NodeRef::label("1");
    service
        .add_grades(period.uuid, &lapse, vec![Grade::new("1st")])
        .unwrap();

    let against_existing = service
        .add_grades(
            period.uuid,
            &lapse,
            vec![Grade::new("2nd"), Grade::new("1st")],
        )
        .unwrap_err();
    assert!(matches!(against_existing, StructureError::DuplicateEntity(_)));

    let internal = service
        .add_grades(
            period.uuid,
            &lapse,
            vec![Grade::new("4th"), Grade::new("5th"), Grade::new("4th")],
        )
        .unwrap_err();
    assert!(matches!(internal, StructureError::DuplicateEntity(_)));

    let stored = service.get_period(period.uuid).unwrap();
    assert_eq!(grade_names(&stored.lapses[0].grades), ["1st"]);

    let updated = service
        .add_grades(
            period.uuid,
            &lapse,
            vec![Grade::new("2nd"), Grade::new(" 3rd ")],
        )
        .unwrap();
    assert_eq!(grade_names(&updated.lapses[0].grades), ["1st", "2nd", "3rd"]);
}

#[test]
fn section_batch_is_all_or_nothing() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let lapse = NodeRef::Ordinal(1);
    let grade = NodeRef::Ordinal(1);
    service
        .add_grades(period.uuid, &lapse, vec![Grade::new("3rd")])
        .unwrap();
    service
        .add_sections(period.uuid, &lapse, &grade, vec![Section::new("A")])
        .unwrap();

    let err = service
        .add_sections(
            period.uuid,
            &lapse,
            &grade,
            vec![Section::new("B"), Section::new("A")],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StructureError::DuplicateEntity(ref duplicate)
            if duplicate.kind == EntityKind::Section && duplicate.value == "A"
    ));

    let stored = service.get_period(period.uuid).unwrap();
    let sections = &stored.lapses[0].grades[0].sections;
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].name, "A");
}

#[test]
fn same_section_name_is_allowed_under_different_grades() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let lapse = NodeRef::Ordinal(1);
    service
        .add_grades(
            period.uuid,
            &lapse,
            vec![Grade::new("3rd"), Grade::new("4th")],
        )
        .unwrap();

    service
        .add_sections(period.uuid, &lapse, &NodeRef::label("3rd"), vec![Section::new("A")])
        .unwrap();
    let updated = service
        .add_sections(period.uuid, &lapse, &NodeRef::label("4th"), vec![Section::new("A")])
        .unwrap();

    assert_eq!(updated.lapses[0].grades[0].sections.len(), 1);
    assert_eq!(updated.lapses[0].grades[1].sections.len(), 1);
}

#[test]
fn nodes_can_be_addressed_by_stable_id() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    let lapse = Lapse::new(2);
    let lapse_id = lapse.uuid;
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    service.add_lapse(period.uuid, lapse).unwrap();

    let grade = Grade::new("5th");
    let grade_id = grade.uuid;
    service
        .add_grades(period.uuid, &NodeRef::Id(lapse_id), vec![grade])
        .unwrap();
    let updated = service
        .add_sections(
            period.uuid,
            &NodeRef::Id(lapse_id),
            &NodeRef::Id(grade_id),
            vec![Section::new("U")],
        )
        .unwrap();

    assert!(updated.lapses[0].grades.is_empty());
    assert_eq!(updated.lapses[1].grades[0].uuid, grade_id);
    assert_eq!(updated.lapses[1].grades[0].sections[0].name, "U");
}

#[test]
fn missing_period_or_node_is_reported() {
    let conn = setup();
    let service = service(&conn);

    let missing = uuid::Uuid::new_v4();
    let err = service.add_lapse(missing, Lapse::new(1)).unwrap_err();
    assert!(matches!(err, StructureError::PeriodNotFound(id) if id == missing));

    let period = service.create_period("2025-2026").unwrap();
    let err = service
        .add_grades(period.uuid, &NodeRef::Ordinal(1), vec![Grade::new("1st")])
        .unwrap_err();
    assert!(matches!(
        err,
        StructureError::NodeNotFound {
            kind: EntityKind::Lapse,
            reference: NodeRef::Ordinal(1),
        }
    ));

    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let err = service
        .add_sections(
            period.uuid,
            &NodeRef::Ordinal(1),
            &NodeRef::label("9th"),
            vec![Section::new("A")],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StructureError::NodeNotFound {
            kind: EntityKind::Grade,
            ..
        }
    ));
}

#[test]
fn blank_grade_name_is_rejected_before_write() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();

    let err = service
        .add_grades(
            period.uuid,
            &NodeRef::Ordinal(1),
            vec![Grade::new("1st"), Grade::new("  ")],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StructureError::Validation(ModelValidationError::BlankGradeName)
    ));

    let repo = SqlitePeriodRepository::try_new(&conn).unwrap();
    let stored = repo.find_period(period.uuid).unwrap().unwrap();
    assert!(stored.lapses[0].grades.is_empty());
}

#[test]
fn structural_additions_reject_prefilled_students() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();
    service.add_lapse(period.uuid, Lapse::new(1)).unwrap();
    let lapse = NodeRef::Ordinal(1);
    service
        .add_grades(period.uuid, &lapse, vec![Grade::new("3rd")])
        .unwrap();

    let mut section = Section::new("A");
    section.students.push(ghost_record());
    let err = service
        .add_sections(period.uuid, &lapse, &NodeRef::Ordinal(1), vec![section])
        .unwrap_err();
    assert!(matches!(
        err,
        StructureError::Validation(ModelValidationError::PrefilledEnrollments {
            kind: EntityKind::Section,
            ref value,
        }) if value == "A"
    ));

    let mut section = Section::new("B");
    section.students.push(ghost_record());
    let mut grade = Grade::new("4th");
    grade.sections.push(section);
    let err = service
        .add_grades(period.uuid, &lapse, vec![grade.clone()])
        .unwrap_err();
    assert!(matches!(
        err,
        StructureError::Validation(ModelValidationError::PrefilledEnrollments {
            kind: EntityKind::Grade,
            ..
        })
    ));

    let mut nested = Lapse::new(2);
    nested.grades.push(grade);
    let err = service.add_lapse(period.uuid, nested).unwrap_err();
    assert!(matches!(
        err,
        StructureError::Validation(ModelValidationError::PrefilledEnrollments {
            kind: EntityKind::Lapse,
            ..
        })
    ));

    let stored = service.get_period(period.uuid).unwrap();
    assert_eq!(stored.lapses.len(), 1);
    assert_eq!(grade_names(&stored.lapses[0].grades), ["3rd"]);
    assert!(stored.lapses[0].grades[0].sections.is_empty());
    assert_eq!(stored.lapses[0].enrollments().count(), 0);
}

#[test]
fn nested_labels_are_trimmed_when_adding_a_lapse() {
    let conn = setup();
    let service = service(&conn);
    let period = service.create_period("2025-2026").unwrap();

    let mut grade = Grade::new(" 3rd ");
    grade.sections.push(Section::new("  A"));
    let mut lapse = Lapse::new(1);
    lapse.grades.push(grade);
    let updated = service.add_lapse(period.uuid, lapse).unwrap();

    let grade = &updated.lapses[0].grades[0];
    assert_eq!(grade.name, "3rd");
    assert_eq!(grade.sections[0].name, "A");
    assert!(updated.lapses[0]
        .grade(&NodeRef::label("3rd"))
        .and_then(|grade| grade.section(&NodeRef::label("A")))
        .is_some());
}
