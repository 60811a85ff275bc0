use crate::infra::{build_engines, InMemoryAlertPublisher};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;
use tramite::error::AppError;
use tramite::workflows::archival::{
    ArchiveRecord, ArchiveRequest, Classification, DocumentId, ExpirationAlertKind,
    ExpirationSweeper, RetentionPolicy, SweepReport, SweepSettings, DEFAULT_SITE_PREFIX,
};
use tramite::workflows::offices::{NewOffice, Office, OfficePriority};
use tramite::workflows::routing::{
    CaseFileFlow, CaseFileStatus, MovementReason, MoveRequest, NewCaseFile,
};
use tramite::workflows::{FixedClock, LifecycleError, UserId};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Date the scenario starts on (YYYY-MM-DD). Defaults to 2025-01-06.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Site prefix used in location codes
    #[arg(long, default_value = DEFAULT_SITE_PREFIX)]
    pub(crate) site_prefix: String,
    /// Alert window in days for the retention sweep
    #[arg(long, default_value_t = 30)]
    pub(crate) alert_days: u32,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            start: None,
            site_prefix: DEFAULT_SITE_PREFIX.to_string(),
            alert_days: 30,
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// What the scenario produced, kept separate from printing so it can be checked.
pub(crate) struct DemoOutcome {
    pub(crate) offices: Vec<Office>,
    pub(crate) flow: CaseFileFlow,
    pub(crate) rejected_move: Option<LifecycleError>,
    pub(crate) archived: Vec<ArchiveRecord>,
    pub(crate) first_sweep: SweepReport,
    pub(crate) restored: ArchiveRecord,
    pub(crate) reopened_status: CaseFileStatus,
    pub(crate) rearchived: ArchiveRecord,
    pub(crate) alerts: Vec<String>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let outcome = run_scenario(&args)?;
    render(&outcome);
    Ok(())
}

pub(crate) fn run_scenario(args: &DemoArgs) -> Result<DemoOutcome, AppError> {
    let start = args
        .start
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(2025, 1, 6).unwrap_or_default());
    let clock = Arc::new(FixedClock::new(morning(start)));
    let engines = build_engines(clock.clone(), &args.site_prefix);
    let clerk = UserId("mesa.partes".to_string());
    let archivist = UserId("archivo.central".to_string());

    let reception = engines
        .offices
        .create_office(office("Mesa de Partes", "RECEPCION", 5, OfficePriority::High))?;
    let legal = engines
        .offices
        .create_office(office("Asesoria Legal", "LEGAL", 1, OfficePriority::Normal))?;
    let management = engines
        .offices
        .create_office(office("Gerencia General", "GERENCIA", 2, OfficePriority::Critical))?;

    let license = engines.routing.register_case_file(NewCaseFile {
        number: "EXP-2025-0001".to_string(),
        company_id: "20100070970".to_string(),
    })?;
    let permit = engines.routing.register_case_file(NewCaseFile {
        number: "EXP-2025-0002".to_string(),
        company_id: "20512345678".to_string(),
    })?;

    for case_file in [&license, &permit] {
        engines.routing.move_case_file(MoveRequest::new(
            case_file.id.clone(),
            reception.id.clone(),
            MovementReason::Referral,
            clerk.clone(),
        ))?;
    }
    engines
        .routing
        .transition_status(&license.id, CaseFileStatus::InProcess)?;

    clock.advance(Duration::hours(4));
    engines.routing.move_case_file(
        MoveRequest::new(
            license.id.clone(),
            legal.id.clone(),
            MovementReason::Review,
            clerk.clone(),
        )
        .with_notes("Revision de requisitos legales")
        .with_documents(
            ["solicitud", "vigencia de poder", "plano"],
            ["solicitud", "vigencia de poder"],
        ),
    )?;

    let rejected_move = engines
        .routing
        .move_case_file(MoveRequest::new(
            permit.id.clone(),
            legal.id.clone(),
            MovementReason::Review,
            clerk.clone(),
        ))
        .err();

    clock.advance(Duration::days(2));
    engines.routing.move_case_file(
        MoveRequest::new(
            license.id.clone(),
            management.id.clone(),
            MovementReason::Signature,
            clerk.clone(),
        )
        .with_notes("Opinion favorable"),
    )?;
    engines.routing.move_case_file(MoveRequest::new(
        permit.id.clone(),
        legal.id.clone(),
        MovementReason::Review,
        clerk.clone(),
    ))?;

    clock.advance(Duration::days(1));
    engines
        .routing
        .transition_status(&license.id, CaseFileStatus::Completed)?;
    let flow = engines.routing.flow(&license.id)?;

    let archived = vec![
        engines.archival.archive_document(ArchiveRequest {
            document_id: DocumentId("DOC-LIC-0001-RESOLUCION".to_string()),
            case_file_id: license.id.clone(),
            classification: Classification::DocumentProcessing,
            retention_policy: RetentionPolicy::TenYears,
            physical_location: Some("Estante A, caja 3".to_string()),
            reason: Some("Licencia otorgada".to_string()),
            user_id: archivist.clone(),
        })?,
        engines.archival.archive_document(ArchiveRequest {
            document_id: DocumentId("DOC-LIC-0001-INFORME".to_string()),
            case_file_id: license.id.clone(),
            classification: Classification::Legal,
            retention_policy: RetentionPolicy::OneYear,
            physical_location: Some("Estante C, caja 1".to_string()),
            reason: None,
            user_id: archivist.clone(),
        })?,
    ];

    let publisher = Arc::new(InMemoryAlertPublisher::default());
    let sweeper = ExpirationSweeper::new(
        engines.archival.clone(),
        publisher.clone(),
        SweepSettings {
            alert_days: args.alert_days,
            ..SweepSettings::default()
        },
    );
    let (_shutdown, shutdown_rx) = watch::channel(false);

    clock.advance(Duration::days(350));
    let first_sweep = sweeper.sweep(&shutdown_rx)?;

    let restored = engines.archival.restore_document(
        &archived[1].id,
        "Solicitado por fiscalizacion posterior",
        archivist.clone(),
    )?;
    let reopened_status = engines.routing.case_file(&license.id)?.status;

    engines
        .routing
        .transition_status(&license.id, CaseFileStatus::Completed)?;
    clock.advance(Duration::days(1));
    let rearchived = engines.archival.archive_document(ArchiveRequest {
        document_id: DocumentId("DOC-LIC-0001-INFORME".to_string()),
        case_file_id: license.id.clone(),
        classification: Classification::Legal,
        retention_policy: RetentionPolicy::ThreeYears,
        physical_location: Some("Estante C, caja 2".to_string()),
        reason: Some("Fiscalizacion concluida".to_string()),
        user_id: archivist,
    })?;

    let alerts = publisher
        .events()
        .into_iter()
        .map(|alert| {
            let label = match alert.kind {
                ExpirationAlertKind::Expiring => "expiring",
                ExpirationAlertKind::Expired => "expired",
            };
            format!(
                "{} {} ({} days, {})",
                alert.location_code, label, alert.days_remaining, alert.retention_expires_at
            )
        })
        .collect();

    Ok(DemoOutcome {
        offices: engines.offices.list_offices()?,
        flow,
        rejected_move,
        archived,
        first_sweep,
        restored,
        reopened_status,
        rearchived,
        alerts,
    })
}

fn morning(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(9, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_default()
}

fn office(name: &str, office_type: &str, max_capacity: u32, priority: OfficePriority) -> NewOffice {
    NewOffice {
        name: name.to_string(),
        office_type: office_type.to_string(),
        max_capacity,
        average_processing_days: 3.0,
        priority,
        is_active: true,
    }
}

fn render(outcome: &DemoOutcome) {
    println!("Case file routing demo");
    println!("\nOffices");
    for office in &outcome.offices {
        println!(
            "- {} [{}] {}/{} case files",
            office.name,
            office.priority.label(),
            office.active_case_files,
            office.max_capacity
        );
    }

    println!(
        "\nFlow of {} (status {})",
        outcome.flow.case_file_id, outcome.flow.status
    );
    for movement in &outcome.flow.movements {
        let from = movement
            .from_office_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "- {} {} -> {} ({:?})",
            movement.moved_at.format("%Y-%m-%d %H:%M"),
            from,
            movement.to_office_id,
            movement.reason
        );
        let pending = movement.pending_documents();
        if !pending.is_empty() {
            println!("  pending documents: {}", pending.join(", "));
        }
    }
    if let Some(err) = &outcome.rejected_move {
        println!("Rejected move: {err}");
    }

    println!("\nArchive");
    for record in &outcome.archived {
        let expiry = record
            .retention_expires_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "- {} {} expires {}",
            record.location_code, record.document_id, expiry
        );
    }

    println!(
        "\nRetention sweep: {} expiring, {} expired, {} alerts published",
        outcome.first_sweep.expiring, outcome.first_sweep.expired, outcome.first_sweep.published
    );
    for alert in &outcome.alerts {
        println!("- {alert}");
    }

    println!(
        "\nRestored {} -> case file back to {}",
        outcome.restored.location_code, outcome.reopened_status
    );
    println!("Re-archived as {}", outcome.rearchived.location_code);
}
