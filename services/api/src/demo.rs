use crate::infra::{parse_time, seed_directory, seed_settings, GENERAL_SERVICE, VIP_SERVICE};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;
use queuedesk::clock::{Clock, FixedClock};
use queuedesk::config::QueueConfig;
use queuedesk::error::AppError;
use queuedesk::ids::{CounterId, CustomerId, QueueCustomerId, StaffId};
use queuedesk::notifications::{ChannelNotifier, Notification};
use queuedesk::workflows::admissions::{
    AdmissionWorkflowEngine, ApplicantProfile, DetailKind, DetailSpec, EnrollApplicant,
    MemoryAdmissionStore, MoveApplicant, NewPipeline, NewStep, PipelineCatalog,
};
use queuedesk::workflows::queue::settings::{
    DEFAULT_BUSINESS_HOURS_END, DEFAULT_BUSINESS_HOURS_START, DEFAULT_NUMBER_FORMAT,
};
use queuedesk::workflows::queue::{
    CreateTicket, MemoryTicketStore, QueueFilter, QueueTicketService, TicketView,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Demo date (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Wall-clock time (HH:MM, UTC) at which the first ticket is issued. Defaults to 10:00.
    #[arg(long, value_parser = parse_time)]
    pub(crate) at: Option<NaiveTime>,
    /// Skip the admissions portion of the demo.
    #[arg(long)]
    pub(crate) skip_admissions: bool,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        date,
        at,
        skip_admissions,
    } = args;

    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let at = at.unwrap_or_else(|| NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default());
    let start = date.and_time(at).and_utc();

    let clock = Arc::new(FixedClock::new(start));
    let (notifier, mut notifications) = ChannelNotifier::new(256);
    let notifier = Arc::new(notifier);

    println!("Queue desk demo ({})", start.format("%Y-%m-%d %H:%M UTC"));
    run_ticket_demo(clock.clone(), notifier.clone())?;
    if !skip_admissions {
        run_admission_demo(clock, notifier.clone())?;
    }
    drop(notifier);

    let mut published: Vec<Notification> = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        published.push(notification);
    }
    println!("\nNotifications published: {}", published.len());
    for notification in &published {
        println!("  - [{}] {}", notification.channel, notification.event);
    }
    Ok(())
}

fn run_ticket_demo(
    clock: Arc<FixedClock>,
    notifier: Arc<ChannelNotifier>,
) -> Result<(), AppError> {
    let settings = seed_settings(&QueueConfig {
        business_hours_start: DEFAULT_BUSINESS_HOURS_START.to_string(),
        business_hours_end: DEFAULT_BUSINESS_HOURS_END.to_string(),
        ticket_number_format: DEFAULT_NUMBER_FORMAT.to_string(),
    });
    let service = QueueTicketService::new(
        Arc::new(seed_directory()?),
        Arc::new(settings),
        Arc::new(MemoryTicketStore::default()),
        notifier,
        clock.clone() as Arc<dyn Clock>,
    );

    println!("\nTicket issuance");
    let first = service.create(VIP_SERVICE, CreateTicket::for_customer(CustomerId(101)))?;
    print_ticket(&first);
    clock.advance(chrono::Duration::minutes(2));
    let second = service.create(
        VIP_SERVICE,
        CreateTicket::for_queue_customer(QueueCustomerId(7)),
    )?;
    print_ticket(&second);
    let general = service.create(GENERAL_SERVICE, CreateTicket::for_customer(CustomerId(102)))?;
    print_ticket(&general);

    println!("\nDesk activity");
    clock.advance(chrono::Duration::minutes(3));
    let called = service.claim(first.ticket.id, StaffId(7), Some(CounterId(2)))?;
    print_ticket(&called);
    match service.claim(first.ticket.id, StaffId(8), Some(CounterId(3))) {
        Ok(_) => println!("  ! second claim unexpectedly succeeded"),
        Err(err) => println!("  second claim rejected: {err}"),
    }
    service.start(first.ticket.id)?;
    clock.advance(chrono::Duration::minutes(6));
    let done = service.resolve(first.ticket.id, Some("membership renewed".to_string()))?;
    print_ticket(&done);

    clock.advance(chrono::Duration::minutes(10));
    println!("\nVIP board");
    for entry in service.queue(VIP_SERVICE, QueueFilter::default())? {
        println!(
            "  {} {} | waited {} min{}",
            entry.view.ticket.number,
            entry.view.ticket.status,
            entry.waited_minutes,
            if entry.sla_breached { " | SLA breached" } else { "" }
        );
    }

    let closed = clock.now().date_naive().and_time(NaiveTime::MIN).and_utc()
        + chrono::Duration::hours(6);
    clock.set(closed);
    match service.create(VIP_SERVICE, CreateTicket::for_customer(CustomerId(103))) {
        Ok(view) => println!("  ! issued {} outside hours", view.ticket.number),
        Err(err) => println!("\nEarly arrival at {}: {err}", hhmm(closed)),
    }
    Ok(())
}

fn run_admission_demo(
    clock: Arc<FixedClock>,
    notifier: Arc<ChannelNotifier>,
) -> Result<(), AppError> {
    let store = Arc::new(MemoryAdmissionStore::default());
    let catalog = PipelineCatalog::new(store.clone());
    let engine = AdmissionWorkflowEngine::new(store, notifier, clock as Arc<dyn Clock>);

    let pipeline = catalog.create_pipeline(NewPipeline {
        name: "Undergraduate intake".to_string(),
        year: 2025,
    })?;
    let mut step_ids = Vec::new();
    for (title, is_final) in [
        ("Registration", false),
        ("Document Review", false),
        ("Interview", false),
        ("Decision", true),
    ] {
        let step = catalog.add_step(
            pipeline.id,
            NewStep {
                title: title.to_string(),
                is_final,
                ..NewStep::default()
            },
        )?;
        step_ids.push(step.id);
    }
    let (registration, review) = (step_ids[0], step_ids[1]);
    catalog.set_dynamic_details(
        registration,
        vec![DetailSpec {
            key: "school_name".to_string(),
            kind: DetailKind::Text,
            required: true,
            label: Some("School name".to_string()),
            options: Vec::new(),
        }],
    )?;
    catalog.set_requirements(review, vec!["id_card".to_string(), "transcript".to_string()])?;

    println!("\nAdmissions: {} {}", pipeline.name, pipeline.year);
    let applicant = engine.enroll(
        pipeline.id,
        EnrollApplicant {
            profile: ApplicantProfile {
                full_name: "Ada Lovelace".to_string(),
                ..ApplicantProfile::default()
            },
            notes: None,
        },
    )?;
    println!("  enrolled applicant {} on step {}", applicant.id, registration);

    let request = || MoveApplicant {
        to_step_id: review,
        by_admin_id: StaffId(1),
        note: Some("ready for review".to_string()),
    };
    report_move(engine.move_applicant(applicant.id, request()));

    for doc_key in ["id_card", "transcript"] {
        engine.register_document(applicant.id, doc_key, format!("uploads/{doc_key}.pdf"))?;
    }
    report_move(engine.move_applicant(applicant.id, request()));

    engine.set_detail(applicant.id, "school_name", "Northside High".to_string())?;
    report_move(engine.move_applicant(applicant.id, request()));

    for row in engine.history(applicant.id)? {
        println!(
            "  history: {} -> {} by staff {} ({})",
            row.from_step_id,
            row.to_step_id,
            row.by_admin_id,
            row.note.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn report_move<T, E: std::fmt::Display>(result: Result<T, E>) {
    match result {
        Ok(_) => println!("  move committed"),
        Err(err) => println!("  move blocked: {err}"),
    }
}

fn print_ticket(view: &TicketView) {
    let position = view
        .position
        .map(|position| format!(" | position {position}"))
        .unwrap_or_default();
    println!(
        "  {} [{}]{}",
        view.ticket.number, view.ticket.status, position
    );
}

fn hhmm(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}
