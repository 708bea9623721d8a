//! End-to-end tests through the engine facade.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use medstock_core::{
    Direction, Engine, EngineError, Medication, NewMovement, Posology, RequestStatus, StockStatus,
    TimeWindow, Urgency, Weekday, YearMonth,
};

const OWNER: Option<&str> = Some("owner-1");
const NURSE: Option<&str> = Some("nurse-1");

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn posology(consumption: Decimal) -> Posology {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    Posology::continuous("8/8h".into(), start, consumption)
}

fn medication(engine: &Engine, name: &str, stock: Decimal) -> Medication {
    engine
        .create_medication(OWNER, Medication::new(name.into(), String::new()), stock)
        .unwrap()
}

#[test]
fn test_total_consumption_follows_links() {
    init_tracing();
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Losartana 50mg", dec!(70));
    let p1 = engine.create_patient(OWNER, "Ana".into()).unwrap();
    let p2 = engine.create_patient(OWNER, "Bruno".into()).unwrap();

    engine.attach_patient(OWNER, &med.id, &p1.id, posology(dec!(1.5))).unwrap();
    engine.attach_patient(OWNER, &med.id, &p2.id, posology(dec!(2.0))).unwrap();
    assert_eq!(engine.total_daily_consumption(OWNER, &med.id).unwrap(), dec!(3.5));
    assert_eq!(engine.days_remaining(OWNER, &med.id).unwrap(), 20);

    assert!(matches!(
        engine.attach_patient(OWNER, &med.id, &p1.id, posology(dec!(9))),
        Err(EngineError::DuplicateAssociation { .. })
    ));

    engine.detach_patient(OWNER, &med.id, &p1.id).unwrap();
    assert_eq!(engine.total_daily_consumption(OWNER, &med.id).unwrap(), dec!(2.0));
    assert_eq!(engine.current_stock(OWNER, &med.id).unwrap(), dec!(70));
    assert!(engine.get_patient(OWNER, &p1.id).unwrap().is_some());
}

#[test]
fn test_overflowing_entry_keeps_engine_usable() {
    init_tracing();
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Soro fisiológico", Decimal::ZERO);
    let half = Decimal::MAX / Decimal::TWO + Decimal::ONE;
    let entry = || NewMovement::new(med.id.clone(), Direction::In, half, "Doação".into());

    engine.record_movement(OWNER, entry()).unwrap();
    assert!(matches!(
        engine.record_movement(OWNER, entry()),
        Err(EngineError::InvalidInput(_))
    ));

    assert_eq!(engine.current_stock(OWNER, &med.id).unwrap(), half);
    assert_eq!(engine.movement_history(OWNER, &med.id).unwrap().len(), 1);
    engine
        .record_movement(OWNER, NewMovement::new(med.id.clone(), Direction::Out, half, "Uso".into()))
        .unwrap();
    assert_eq!(engine.current_stock(OWNER, &med.id).unwrap(), Decimal::ZERO);
}

#[test]
fn test_update_posology_touches_one_pairing() {
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Metformina", dec!(100));
    let p1 = engine.create_patient(OWNER, "Ana".into()).unwrap();
    let p2 = engine.create_patient(OWNER, "Bruno".into()).unwrap();
    engine.attach_patient(OWNER, &med.id, &p1.id, posology(dec!(1))).unwrap();
    engine.attach_patient(OWNER, &med.id, &p2.id, posology(dec!(2))).unwrap();

    let mut updated = posology(dec!(4));
    updated.administration_times = vec![t(20, 0), t(8, 0), t(8, 0)];
    engine.update_posology(OWNER, &med.id, &p1.id, updated).unwrap();

    let links = engine.medication_links(OWNER, &med.id).unwrap();
    assert_eq!(links[0].posology.daily_consumption, dec!(4));
    assert_eq!(links[0].posology.administration_times, vec![t(8, 0), t(20, 0)]);
    assert_eq!(links[1].posology.daily_consumption, dec!(2));
    assert_eq!(engine.total_daily_consumption(OWNER, &med.id).unwrap(), dec!(6));
}

#[test]
fn test_attach_requires_ownership() {
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Dipirona", dec!(10));
    let patient = engine.create_patient(NURSE, "Carla".into()).unwrap();

    // Owner of the medication cannot reach the nurse's patient.
    assert!(matches!(
        engine.attach_patient(OWNER, &med.id, &patient.id, posology(dec!(1))),
        Err(EngineError::Forbidden(_))
    ));
    // The nurse does not own the medication.
    assert!(matches!(
        engine.attach_patient(NURSE, &med.id, &patient.id, posology(dec!(1))),
        Err(EngineError::Forbidden(_))
    ));
}

#[test]
fn test_replenishment_round_trip() {
    init_tracing();
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Insulina NPH", dec!(3));
    let patient = engine.create_patient(OWNER, "Ana".into()).unwrap();
    engine.attach_patient(OWNER, &med.id, &patient.id, posology(dec!(1))).unwrap();
    engine.share_patient(OWNER, &patient.id, "nurse-1").unwrap();

    // The nurse reaches the medication through the shared patient.
    let (request_id, alert) = engine
        .create_replenishment_request(NURSE, &med.id, dec!(30), Urgency::High, Some("última caixa".into()))
        .unwrap();
    assert!(alert.is_some());

    let request = engine.get_replenishment_request(NURSE, &request_id).unwrap();
    assert_eq!(request.owner_id, "owner-1");
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(engine.pending_replenishment_requests(OWNER).unwrap().len(), 1);

    assert!(matches!(
        engine.approve_replenishment_request(NURSE, &request_id, dec!(30)),
        Err(EngineError::Forbidden(_))
    ));

    let approved = engine.approve_replenishment_request(OWNER, &request_id, dec!(28)).unwrap();
    assert_eq!(approved.status, RequestStatus::Completed);
    assert_eq!(approved.added_quantity, Some(dec!(28)));
    assert_eq!(engine.current_stock(OWNER, &med.id).unwrap(), dec!(31));

    assert!(matches!(
        engine.approve_replenishment_request(OWNER, &request_id, dec!(28)),
        Err(EngineError::InvalidState(_))
    ));
    assert_eq!(engine.current_stock(OWNER, &med.id).unwrap(), dec!(31));
    assert!(engine.pending_replenishment_requests(OWNER).unwrap().is_empty());
    assert_eq!(engine.my_replenishment_requests(NURSE).unwrap().len(), 1);
}

#[test]
fn test_status_moves_with_stock() {
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Omeprazol", dec!(10));
    let patient = engine.create_patient(OWNER, "Ana".into()).unwrap();
    engine.attach_patient(OWNER, &med.id, &patient.id, posology(dec!(1))).unwrap();

    assert_eq!(engine.stock_report(OWNER, &med.id).unwrap().status, StockStatus::Ok);

    let take = |qty: Decimal| NewMovement::new(med.id.clone(), Direction::Out, qty, "Uso".into());
    engine.record_movement(OWNER, take(dec!(3))).unwrap();
    assert_eq!(engine.stock_report(OWNER, &med.id).unwrap().status, StockStatus::Warning);

    engine.record_movement(OWNER, take(dec!(4))).unwrap();
    let report = engine.stock_report(OWNER, &med.id).unwrap();
    assert_eq!(report.days_remaining, 3);
    assert_eq!(report.status, StockStatus::Critical);

    let alert = engine.stock_alert(OWNER, &med.id).unwrap().unwrap();
    assert_eq!(alert.kind, medstock_core::AlertKind::CriticalStock);

    assert!(matches!(
        engine.record_movement(OWNER, take(dec!(4))),
        Err(EngineError::InsufficientStock { .. })
    ));
    assert_eq!(engine.movement_history(OWNER, &med.id).unwrap().len(), 3);
}

#[test]
fn test_schedule_resolution_by_label() {
    let engine = Engine::open_in_memory().unwrap();
    let patient = engine.create_patient(OWNER, "Dona Maria".into()).unwrap();
    let night = engine.create_caregiver(OWNER, "Joana".into(), None).unwrap();
    let day = engine
        .create_caregiver(OWNER, "Carlos".into(), Some("+55 11 99999-0000".into()))
        .unwrap();

    engine
        .create_schedule(OWNER, &night.id, vec![Weekday::Segunda], TimeWindow::new(t(19, 0), t(8, 0)), vec![patient.id.clone()])
        .unwrap();
    engine
        .create_schedule(OWNER, &day.id, vec![Weekday::Terca], TimeWindow::new(t(8, 0), t(19, 0)), vec![patient.id.clone()])
        .unwrap();

    let on_duty = |label: &str, time: NaiveTime| {
        engine
            .find_responsible_caregiver(OWNER, &patient.id, label, time)
            .unwrap()
    };

    assert_eq!(on_duty("Segunda", t(23, 30)).as_deref(), Some("Joana"));
    assert_eq!(on_duty("segunda-feira", t(6, 0)).as_deref(), Some("Joana"));
    assert_eq!(on_duty("Segunda", t(12, 0)), None);
    assert_eq!(on_duty("Terça", t(12, 0)).as_deref(), Some("Carlos"));
    assert_eq!(on_duty("terca", t(20, 0)), None);

    assert!(engine.overlapping_schedules(OWNER, &patient.id).unwrap().is_empty());
}

#[test]
fn test_deleting_caregiver_removes_schedules() {
    let engine = Engine::open_in_memory().unwrap();
    let patient = engine.create_patient(OWNER, "Dona Maria".into()).unwrap();
    let caregiver = engine.create_caregiver(OWNER, "Joana".into(), None).unwrap();
    engine
        .create_schedule(OWNER, &caregiver.id, vec![Weekday::Domingo], TimeWindow::new(t(7, 0), t(7, 0)), vec![patient.id.clone()])
        .unwrap();

    assert_eq!(
        engine.find_responsible_caregiver(OWNER, &patient.id, "Domingo", t(3, 0)).unwrap().as_deref(),
        Some("Joana")
    );
    engine.delete_caregiver(OWNER, &caregiver.id).unwrap();
    assert_eq!(
        engine.find_responsible_caregiver(OWNER, &patient.id, "Domingo", t(3, 0)).unwrap(),
        None
    );
}

#[test]
fn test_installment_purchase_amortized() {
    let engine = Engine::open_in_memory().unwrap();
    let med = medication(&engine, "Insulina Glargina", Decimal::ZERO);

    let purchase = NewMovement::new(med.id.clone(), Direction::In, dec!(5), "Farmácia".into())
        .priced(dec!(300), Some(3));
    engine.record_movement(OWNER, purchase).unwrap();

    let bought = engine.movement_history(OWNER, &med.id).unwrap()[0].created_at;
    let first = YearMonth::of_timestamp(bought);

    for offset in 0..3 {
        assert_eq!(engine.monthly_expense(OWNER, first.plus_months(offset)).unwrap(), dec!(100));
    }
    assert_eq!(engine.monthly_expense(OWNER, first.plus_months(3)).unwrap(), Decimal::ZERO);
    assert_eq!(engine.monthly_expense(NURSE, first).unwrap(), Decimal::ZERO);

    let year = engine.yearly_expenses(OWNER, first.year).unwrap();
    let total: Decimal = year.iter().map(|m| m.total).sum();
    assert!(total > Decimal::ZERO && total <= dec!(300));
}

#[test]
fn test_engine_persists_on_disk() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("medstock.db");

    let med_id = {
        let engine = Engine::open(&path)?;
        let med = engine.create_medication(OWNER, Medication::new("Atenolol".into(), String::new()), dec!(12.5))?;
        engine.record_movement(OWNER, NewMovement::new(med.id.clone(), Direction::Out, dec!(0.5), "Uso".into()))?;
        med.id
    };

    let reopened = Engine::open(&path)?;
    assert_eq!(reopened.current_stock(OWNER, &med_id)?, dec!(12));
    assert_eq!(reopened.movement_history(OWNER, &med_id)?.len(), 2);
    assert_eq!(reopened.get_thresholds(OWNER)?.critical, 3);
    Ok(())
}
