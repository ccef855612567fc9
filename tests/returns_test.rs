mod common;

use assert_matches::assert_matches;
use common::{dec, weight, TestHarness};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use stateset_worksheets::{
    commands::{
        returns::{ActivateReturnCommand, CompleteReturnCommand, ReturnPalletCommand},
        worksheets::GenerateWorksheetCommand,
        Command,
    },
    entities::{
        inventory_history, release_good, InventoryStatus, InventoryTransactionType,
        LocationStatus, OrderInventoryStatus, OrderStatus, RefOrderKind, WorksheetStatus,
        WorksheetType,
    },
    events::Event,
    services::{
        inbound::PalletMovement, order_targets::TargetStatus, reference_orders::RefOrderLink,
        worksheets::WorksheetBundle,
    },
    ServiceError,
};
use uuid::Uuid;

async fn generate_return(h: &TestHarness, release: &release_good::Model, target_ids: Vec<Uuid>) -> WorksheetBundle {
    GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Return,
        ref_order: RefOrderLink::new(RefOrderKind::ReleaseGood, release.id),
        target_ids,
        ref_order_status: OrderStatus::ReadyToReturn,
        target_status: TargetStatus::Inventory(OrderInventoryStatus::Pending),
        buffer_location_id: None,
        description: None,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .expect("failed to generate return worksheet")
}

async fn return_pallet(h: &TestHarness, detail: &str, pallet: &str, location: &str) -> Result<PalletMovement, ServiceError> {
    ReturnPalletCommand {
        context: h.ctx,
        detail_name: detail.to_string(),
        pallet_id: pallet.to_string(),
        location_name: location.to_string(),
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
}

#[tokio::test]
async fn released_pallet_goes_back_to_stock_and_customer_is_told() {
    let mut h = TestHarness::new().await;
    let customer = Uuid::new_v4();
    h.directory.assign_partner(h.ctx.domain_id, h.bizplace_id, customer);

    let rack = h.location("R-01").await;
    let release = h.release_good("RG-R", OrderStatus::Done, false, None).await;
    let pallet = h.pallet("P-R", 0, dec(0), None, InventoryStatus::Terminated).await;
    let claim = h
        .release_target(&release, "OI-R", Some(&pallet), 10, dec(2000), OrderInventoryStatus::Loaded)
        .await;

    let generated = generate_return(&h, &release, vec![claim.id]).await;
    assert_eq!(generated.worksheet.worksheet_type, WorksheetType::Return);
    let detail = generated.details[0].name.clone();

    // Not executing yet.
    assert_matches!(
        return_pallet(&h, &detail, "P-R", "R-01").await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected status value is EXECUTING but got DEACTIVATED"
    );

    ActivateReturnCommand {
        context: h.ctx,
        worksheet_no: generated.worksheet.name.clone(),
        changed_details: vec![],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();
    assert_eq!(h.reload_target(claim.id).await.unwrap().status, OrderInventoryStatus::Returning);
    let rg = release_good::Entity::find_by_id(release.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(rg.status, OrderStatus::Returning);

    assert_matches!(
        return_pallet(&h, &detail, "P-OTHER", "R-01").await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected pallet value is P-R but got P-OTHER"
    );
    assert_matches!(
        return_pallet(&h, &detail, "P-R", "NOWHERE").await,
        Err(ServiceError::NotFound(_))
    );

    let returned = return_pallet(&h, &detail, "P-R", "R-01").await.unwrap();
    assert_eq!(returned.inventory.qty, 10);
    assert_eq!(weight(returned.inventory.weight), dec(2000));
    assert_eq!(returned.inventory.status, InventoryStatus::Stored);
    assert_eq!(returned.inventory.location_id, Some(rack.id));
    assert_eq!(returned.detail.status, WorksheetStatus::Done);
    assert_eq!(returned.detail.to_location_id, Some(rack.id));
    assert_eq!(h.reload_location(rack.id).await.status, LocationStatus::Stored);
    assert_eq!(h.reload_target(claim.id).await.unwrap().status, OrderInventoryStatus::Terminated);

    let history = inventory_history::Entity::find()
        .filter(inventory_history::Column::InventoryId.eq(pallet.id))
        .order_by_asc(inventory_history::Column::Seq)
        .all(h.conn())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_type, InventoryTransactionType::Return);
    assert_eq!(history[0].qty_delta, 10);
    assert_eq!(weight(history[0].weight_delta), dec(2000));
    assert_eq!(history[0].ref_order_id, Some(release.id));

    // A finished detail can't be returned twice.
    assert_matches!(
        return_pallet(&h, &detail, "P-R", "R-01").await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected status value is EXECUTING but got DONE"
    );

    let completed = CompleteReturnCommand { context: h.ctx, worksheet_no: generated.worksheet.name.clone() }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();
    assert_eq!(completed.worksheet.status, WorksheetStatus::Done);
    let rg = release_good::Entity::find_by_id(release.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(rg.status, OrderStatus::Done);

    let events = h.drain_events();
    let notification = events.iter().find_map(|e| match e {
        Event::NotificationRequested { receivers, title, url, .. } => Some((receivers.clone(), title.clone(), url.clone())),
        _ => None,
    });
    let (receivers, title, url) = notification.expect("customer was not notified");
    assert_eq!(receivers, vec![customer]);
    assert_eq!(title, "Return completed");
    assert_eq!(url, format!("return_worksheet_detail/{}", generated.worksheet.name));
}

#[tokio::test]
async fn return_activation_only_accepts_return_worksheets() {
    let h = TestHarness::new().await;
    let release = h.release_good("RG-P", OrderStatus::Pending, false, None).await;
    let claim = h
        .release_target(&release, "OI-P", None, 5, dec(500), OrderInventoryStatus::Pending)
        .await;
    let picking = GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Picking,
        ref_order: RefOrderLink::new(RefOrderKind::ReleaseGood, release.id),
        target_ids: vec![claim.id],
        ref_order_status: OrderStatus::ReadyToPick,
        target_status: TargetStatus::Inventory(OrderInventoryStatus::ReadyToPick),
        buffer_location_id: None,
        description: None,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();

    let result = ActivateReturnCommand {
        context: h.ctx,
        worksheet_no: picking.worksheet.name.clone(),
        changed_details: vec![],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await;
    assert_matches!(result, Err(ServiceError::PreconditionViolation(_)));
}
