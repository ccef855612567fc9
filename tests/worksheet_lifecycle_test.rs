mod common;

use assert_matches::assert_matches;
use common::TestHarness;
use sea_orm::EntityTrait;
use stateset_worksheets::{
    commands::{
        vas::{ActivateVasCommand, CompleteVasCommand},
        worksheets::{CompleteWorksheetCommand, GenerateWorksheetCommand},
        Command,
    },
    context::OperationContext,
    entities::{
        order_vas, vas_order, OrderInventoryStatus, OrderStatus, OrderVasStatus, RefOrderKind,
        WorksheetStatus, WorksheetType,
    },
    events::Event,
    services::{
        order_targets::TargetStatus,
        reference_orders::RefOrderLink,
        worksheet_queries::{GetWorksheetQuery, ListWorksheetsQuery, Query, WorksheetFilter},
        worksheets::{DetailPatch, WorksheetBundle},
    },
    ServiceError,
};
use uuid::Uuid;

struct VasFixture {
    order: vas_order::Model,
    targets: Vec<order_vas::Model>,
}

async fn vas_fixture(h: &TestHarness, name: &str) -> VasFixture {
    let order = h.vas_order(name, OrderStatus::Pending).await;
    let link = RefOrderLink::new(RefOrderKind::VasOrder, order.id);
    let mut targets = Vec::new();
    for i in 1..=2 {
        targets.push(
            h.order_vas(link, &format!("{}-OV-{}", name, i), OrderVasStatus::Pending)
                .await,
        );
    }
    VasFixture { order, targets }
}

async fn generate_vas(h: &TestHarness, fixture: &VasFixture) -> Result<WorksheetBundle, ServiceError> {
    GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Vas,
        ref_order: RefOrderLink::new(RefOrderKind::VasOrder, fixture.order.id),
        target_ids: fixture.targets.iter().map(|t| t.id).collect(),
        ref_order_status: OrderStatus::ReadyToPick,
        target_status: TargetStatus::Vas(OrderVasStatus::ReadyToProcess),
        buffer_location_id: None,
        description: Some("Relabel cartons".to_string()),
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
}

#[tokio::test]
async fn vas_worksheet_runs_from_generation_to_completion() {
    let mut h = TestHarness::new().await;
    let fixture = vas_fixture(&h, "VAS-ORD-1").await;

    let generated = generate_vas(&h, &fixture).await.unwrap();
    assert_eq!(generated.worksheet.worksheet_type, WorksheetType::Vas);
    assert_eq!(generated.worksheet.status, WorksheetStatus::Deactivated);
    assert_eq!(generated.worksheet.bizplace_id, h.bizplace_id);
    assert_eq!(generated.details.len(), 2);
    assert!(generated
        .details
        .iter()
        .all(|d| d.description.as_deref() == Some("Relabel cartons")));

    let order = vas_order::Entity::find_by_id(fixture.order.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::ReadyToPick);
    let target = order_vas::Entity::find_by_id(fixture.targets[0].id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(target.status, OrderVasStatus::ReadyToProcess);

    let first_detail = generated.details[0].name.clone();
    let activated = ActivateVasCommand {
        context: h.ctx,
        worksheet_no: generated.worksheet.name.clone(),
        changed_details: vec![DetailPatch {
            name: first_detail.clone(),
            issue: Some("Label printer jammed".to_string()),
            ..Default::default()
        }],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();
    assert_eq!(activated.worksheet.status, WorksheetStatus::Executing);
    assert!(activated.worksheet.started_at.is_some());
    let patched = activated.details.iter().find(|d| d.name == first_detail).unwrap();
    assert_eq!(patched.issue.as_deref(), Some("Label printer jammed"));
    assert!(activated.details.iter().all(|d| d.status == WorksheetStatus::Executing));

    let completed = CompleteVasCommand { context: h.ctx, worksheet_no: generated.worksheet.name.clone() }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();
    assert_eq!(completed.worksheet.status, WorksheetStatus::Done);
    assert!(completed.worksheet.ended_at.is_some());
    assert!(completed.details.iter().all(|d| d.status == WorksheetStatus::Done));

    for target in &fixture.targets {
        let target = order_vas::Entity::find_by_id(target.id).one(h.conn()).await.unwrap().unwrap();
        assert_eq!(target.status, OrderVasStatus::Terminated);
    }
    let order = vas_order::Entity::find_by_id(fixture.order.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Done);

    let events = h.drain_events();
    assert_matches!(events.first(), Some(Event::WorksheetGenerated { detail_count: 2, .. }));
    assert!(events.iter().any(|e| matches!(e, Event::WorksheetActivated { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::WorksheetCompleted { ref_order_status: Some(status), .. } if status == "DONE"
    )));
}

#[tokio::test]
async fn completed_worksheet_cannot_be_completed_again() {
    let h = TestHarness::new().await;
    let fixture = vas_fixture(&h, "VAS-ORD-2").await;
    let generated = generate_vas(&h, &fixture).await.unwrap();
    let worksheet_no = generated.worksheet.name.clone();

    ActivateVasCommand { context: h.ctx, worksheet_no: worksheet_no.clone(), changed_details: vec![] }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();
    CompleteWorksheetCommand { context: h.ctx, worksheet_no: worksheet_no.clone(), ref_order_status: None }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();

    let again = CompleteWorksheetCommand { context: h.ctx, worksheet_no, ref_order_status: None }
        .execute(h.db.clone(), h.collaborators.clone())
        .await;
    assert_matches!(
        again,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected status value is EXECUTING but got DONE"
    );
}

#[tokio::test]
async fn only_deactivated_worksheets_can_be_activated() {
    let h = TestHarness::new().await;
    let fixture = vas_fixture(&h, "VAS-ORD-3").await;
    let generated = generate_vas(&h, &fixture).await.unwrap();
    let worksheet_no = generated.worksheet.name.clone();

    ActivateVasCommand { context: h.ctx, worksheet_no: worksheet_no.clone(), changed_details: vec![] }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();

    let again = ActivateVasCommand { context: h.ctx, worksheet_no, changed_details: vec![] }
        .execute(h.db.clone(), h.collaborators.clone())
        .await;
    assert_matches!(
        again,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected status value is DEACTIVATED but got EXECUTING"
    );
}

#[tokio::test]
async fn generation_rejects_targets_of_the_wrong_kind() {
    let h = TestHarness::new().await;
    let fixture = vas_fixture(&h, "VAS-ORD-4").await;

    let result = GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Vas,
        ref_order: RefOrderLink::new(RefOrderKind::VasOrder, fixture.order.id),
        target_ids: fixture.targets.iter().map(|t| t.id).collect(),
        ref_order_status: OrderStatus::Processing,
        target_status: TargetStatus::Inventory(OrderInventoryStatus::Picking),
        buffer_location_id: None,
        description: None,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await;

    assert_matches!(result, Err(ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn other_tenants_cannot_see_or_drive_the_worksheet() {
    let h = TestHarness::new().await;
    let fixture = vas_fixture(&h, "VAS-ORD-5").await;
    let generated = generate_vas(&h, &fixture).await.unwrap();

    let stranger = OperationContext::new(Uuid::new_v4(), h.ctx.user_id);
    let result = ActivateVasCommand {
        context: stranger,
        worksheet_no: generated.worksheet.name.clone(),
        changed_details: vec![],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));

    let other_fixture = vas_fixture(&h, "VAS-ORD-6").await;
    let result = GenerateWorksheetCommand {
        context: stranger,
        worksheet_type: WorksheetType::Vas,
        ref_order: RefOrderLink::new(RefOrderKind::VasOrder, other_fixture.order.id),
        target_ids: other_fixture.targets.iter().map(|t| t.id).collect(),
        ref_order_status: OrderStatus::Processing,
        target_status: TargetStatus::Vas(OrderVasStatus::ReadyToProcess),
        buffer_location_id: None,
        description: None,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn commands_require_an_actor() {
    let h = TestHarness::new().await;
    let result = CompleteVasCommand {
        context: OperationContext::new(h.ctx.domain_id, Uuid::nil()),
        worksheet_no: "VAS-000001".to_string(),
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await;

    assert_matches!(result, Err(ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn worksheets_are_listed_and_fetched_by_name() {
    let h = TestHarness::new().await;
    let first = vas_fixture(&h, "VAS-ORD-7").await;
    let second = vas_fixture(&h, "VAS-ORD-8").await;
    let one = generate_vas(&h, &first).await.unwrap();
    generate_vas(&h, &second).await.unwrap();

    let page = ListWorksheetsQuery {
        domain_id: h.ctx.domain_id,
        filter: WorksheetFilter {
            worksheet_type: Some(WorksheetType::Vas),
            ..Default::default()
        },
        page: 1,
        limit: 10,
    }
    .execute(h.conn())
    .await
    .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 2);

    let by_order = ListWorksheetsQuery {
        domain_id: h.ctx.domain_id,
        filter: WorksheetFilter {
            ref_order_name: Some("VAS-ORD-7".to_string()),
            ..Default::default()
        },
        page: 1,
        limit: 10,
    }
    .execute(h.conn())
    .await
    .unwrap();
    assert_eq!(by_order.total, 1);
    assert_eq!(by_order.items[0].name, one.worksheet.name);

    let fetched = GetWorksheetQuery { domain_id: h.ctx.domain_id, name: one.worksheet.name.clone() }
        .execute(h.conn())
        .await
        .unwrap();
    assert_eq!(fetched.details.len(), 2);

    let missing = GetWorksheetQuery { domain_id: Uuid::new_v4(), name: one.worksheet.name.clone() }
        .execute(h.conn())
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}

fn generate_for(order: &vas_order::Model, target_ids: Vec<Uuid>, h: &TestHarness) -> GenerateWorksheetCommand {
    GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Vas,
        ref_order: RefOrderLink::new(RefOrderKind::VasOrder, order.id),
        target_ids,
        ref_order_status: OrderStatus::ReadyToPick,
        target_status: TargetStatus::Vas(OrderVasStatus::ReadyToProcess),
        buffer_location_id: None,
        description: None,
    }
}

#[tokio::test]
async fn generation_refuses_a_target_listed_twice() {
    let h = TestHarness::new().await;
    let fixture = vas_fixture(&h, "VAS-ORD-9").await;
    let repeated = fixture.targets[0].id;

    let result = generate_for(&fixture.order, vec![repeated, repeated], &h)
        .execute(h.db.clone(), h.collaborators.clone())
        .await;

    assert_matches!(
        result,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Target VAS-ORD-9-OV-1 is listed more than once"
    );
    let order = vas_order::Entity::find_by_id(fixture.order.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn generation_refuses_targets_of_another_order() {
    let h = TestHarness::new().await;
    let ours = vas_fixture(&h, "VAS-ORD-10").await;
    let theirs = vas_fixture(&h, "VAS-ORD-11").await;

    let result = generate_for(&ours.order, vec![ours.targets[0].id, theirs.targets[0].id], &h)
        .execute(h.db.clone(), h.collaborators.clone())
        .await;

    assert_matches!(
        result,
        Err(ServiceError::PreconditionViolation(msg))
            if msg == "Target VAS-ORD-11-OV-1 doesn't belong to VAS_ORDER VAS-ORD-10"
    );
    for target in [&ours.targets[0], &theirs.targets[0]] {
        let reloaded = order_vas::Entity::find_by_id(target.id).one(h.conn()).await.unwrap().unwrap();
        assert_eq!(reloaded.status, OrderVasStatus::Pending);
    }
}
