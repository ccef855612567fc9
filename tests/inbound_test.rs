mod common;

use assert_matches::assert_matches;
use common::{dec, weight, TestHarness};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use stateset_worksheets::{
    commands::{
        inbound::{
            ActivatePutawayCommand, ActivateUnloadingCommand, CompletePutawayCommand,
            CompleteUnloadingCommand, GeneratePutawayCommand, PutawayCommand, UndoUnloadingCommand,
            UnloadPalletCommand,
        },
        worksheets::GenerateWorksheetCommand,
        Command,
    },
    entities::{
        arrival_notice, inventory, inventory_history, order_inventory, order_product, order_vas, worksheet,
        InventoryStatus, InventoryTransactionType, LocationStatus, OrderInventoryStatus,
        OrderProductStatus, OrderStatus, OrderVasStatus, RefOrderKind, WorksheetStatus,
        WorksheetType,
    },
    services::{
        inbound::{PalletMovement, PalletQtyPatch},
        order_targets::TargetStatus,
        reference_orders::RefOrderLink,
        worksheets::WorksheetBundle,
    },
    ServiceError,
};
use uuid::Uuid;

async fn generate_unloading(
    h: &TestHarness,
    an: &arrival_notice::Model,
    products: &[&order_product::Model],
    buffer_location_id: Uuid,
) -> WorksheetBundle {
    GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Unloading,
        ref_order: RefOrderLink::new(RefOrderKind::ArrivalNotice, an.id),
        target_ids: products.iter().map(|p| p.id).collect(),
        ref_order_status: OrderStatus::ReadyToUnload,
        target_status: TargetStatus::Product(OrderProductStatus::ReadyToUnload),
        buffer_location_id: Some(buffer_location_id),
        description: None,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .expect("failed to generate unloading worksheet")
}

async fn unload(
    h: &TestHarness,
    detail: &str,
    pallet: &str,
    qty: i32,
    weight: rust_decimal::Decimal,
) -> Result<PalletMovement, ServiceError> {
    UnloadPalletCommand {
        context: h.ctx,
        detail_name: detail.to_string(),
        pallet_id: pallet.to_string(),
        qty,
        weight,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
}

async fn putaway(h: &TestHarness, detail: &str, pallet: &str, location: &str) -> Result<PalletMovement, ServiceError> {
    PutawayCommand {
        context: h.ctx,
        detail_name: detail.to_string(),
        pallet_id: pallet.to_string(),
        location_name: location.to_string(),
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
}

async fn reload_an(h: &TestHarness, id: Uuid) -> arrival_notice::Model {
    arrival_notice::Entity::find_by_id(id).one(h.conn()).await.unwrap().unwrap()
}

async fn reload_product(h: &TestHarness, id: Uuid) -> order_product::Model {
    order_product::Entity::find_by_id(id).one(h.conn()).await.unwrap().unwrap()
}

async fn histories(h: &TestHarness, inventory_id: Uuid) -> Vec<inventory_history::Model> {
    inventory_history::Entity::find()
        .filter(inventory_history::Column::InventoryId.eq(inventory_id))
        .order_by_asc(inventory_history::Column::Seq)
        .all(h.conn())
        .await
        .unwrap()
}

#[tokio::test]
async fn arrival_notice_is_unloaded_and_put_away() {
    let mut h = TestHarness::new().await;
    let buffer = h.location("BUF-01").await;
    let shelf = h.location("A-01").await;
    let an = h.arrival_notice("AN-1", OrderStatus::Pending, false).await;
    let product = h.order_product(&an, "OP-1", 20, OrderProductStatus::Pending).await;

    // A VAS line on the same notice waits for unloading to start.
    let link = RefOrderLink::new(RefOrderKind::ArrivalNotice, an.id);
    let vas_line = h.order_vas(link, "OV-1", OrderVasStatus::Pending).await;
    let vas = GenerateWorksheetCommand {
        context: h.ctx,
        worksheet_type: WorksheetType::Vas,
        ref_order: link,
        target_ids: vec![vas_line.id],
        ref_order_status: OrderStatus::ReadyToUnload,
        target_status: TargetStatus::Vas(OrderVasStatus::ReadyToProcess),
        buffer_location_id: None,
        description: None,
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();

    let unloading = generate_unloading(&h, &an, &[&product], buffer.id).await;
    assert_eq!(unloading.worksheet.buffer_location_id, Some(buffer.id));
    let detail = unloading.details[0].name.clone();

    let activated = ActivateUnloadingCommand {
        context: h.ctx,
        worksheet_no: unloading.worksheet.name.clone(),
        pallet_patches: vec![PalletQtyPatch { order_product_name: "OP-1".to_string(), pallet_qty: 2 }],
        changed_details: vec![],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();
    assert_eq!(activated.worksheet.status, WorksheetStatus::Executing);

    let line = reload_product(&h, product.id).await;
    assert_eq!(line.status, OrderProductStatus::Unloading);
    assert_eq!(line.pallet_qty, Some(2));
    assert_eq!(reload_an(&h, an.id).await.status, OrderStatus::Processing);
    let vas_ws = worksheet::Entity::find_by_id(vas.worksheet.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(vas_ws.status, WorksheetStatus::Executing);
    let vas_line = order_vas::Entity::find_by_id(vas_line.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(vas_line.status, OrderVasStatus::Processing);

    let first = unload(&h, &detail, "P-1", 12, dec(2400)).await.unwrap();
    assert_eq!(first.inventory.status, InventoryStatus::Occupied);
    assert_eq!(first.inventory.location_id, Some(buffer.id));
    assert_eq!(first.inventory.warehouse_id, Some(h.warehouse_id));
    assert_eq!(first.inventory.batch_id, "BATCH-1");
    let second = unload(&h, &detail, "P-2", 8, dec(1600)).await.unwrap();
    assert_matches!(
        unload(&h, &detail, "P-1", 3, dec(600)).await,
        Err(ServiceError::DuplicateState(msg)) if msg == "Pallet ID P-1 is already in use"
    );

    let line = reload_product(&h, product.id).await;
    assert_eq!(line.actual_pack_qty, 20);
    assert_eq!(line.actual_pallet_qty, 2);

    let history = histories(&h, first.inventory.id).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_type, InventoryTransactionType::Unloading);
    assert_eq!(history[0].seq, 1);
    assert_eq!(history[0].qty_delta, 12);
    assert_eq!(weight(history[0].weight_delta), dec(2400));
    assert_eq!(history[0].ref_order_id, Some(an.id));

    // The second pallet was miscounted and goes back.
    let detail_after_undo = UndoUnloadingCommand {
        context: h.ctx,
        detail_name: detail.clone(),
        pallet_id: "P-2".to_string(),
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();
    assert_eq!(detail_after_undo.status, WorksheetStatus::Executing);
    assert!(inventory::Entity::find_by_id(second.inventory.id).one(h.conn()).await.unwrap().is_none());
    let undo_history = histories(&h, second.inventory.id).await;
    assert_eq!(undo_history.len(), 2);
    assert_eq!(undo_history[1].transaction_type, InventoryTransactionType::UndoUnloading);
    assert_eq!(undo_history[1].qty_delta, -8);
    let line = reload_product(&h, product.id).await;
    assert_eq!(line.actual_pack_qty, 12);
    assert_eq!(line.actual_pallet_qty, 1);

    let completed = CompleteUnloadingCommand { context: h.ctx, worksheet_no: unloading.worksheet.name.clone() }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();
    assert_eq!(completed.worksheet.status, WorksheetStatus::Done);
    assert_eq!(reload_an(&h, an.id).await.status, OrderStatus::ReadyToPutaway);
    assert_eq!(reload_product(&h, product.id).await.status, OrderProductStatus::Terminated);
    assert_eq!(h.reload_inventory(first.inventory.id).await.status, InventoryStatus::Unloaded);

    let generated = GeneratePutawayCommand { context: h.ctx, arrival_notice_no: "AN-1".to_string() }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();
    assert_eq!(generated.worksheet.worksheet_type, WorksheetType::Putaway);
    assert_eq!(generated.worksheet.buffer_location_id, Some(buffer.id));
    assert_eq!(generated.details.len(), 1);
    assert_eq!(generated.details[0].from_location_id, Some(buffer.id));
    let target = h.reload_target(generated.details[0].target_id).await.unwrap();
    assert_eq!(target.inventory_id, Some(first.inventory.id));
    assert_eq!(target.release_qty, 12);
    assert_eq!(target.status, OrderInventoryStatus::Pending);

    ActivatePutawayCommand {
        context: h.ctx,
        worksheet_no: generated.worksheet.name.clone(),
        changed_details: vec![],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();
    assert_eq!(reload_an(&h, an.id).await.status, OrderStatus::PuttingAway);
    assert_eq!(
        h.reload_target(target.id).await.unwrap().status,
        OrderInventoryStatus::PuttingAway
    );

    let putaway_detail = generated.details[0].name.clone();
    assert_matches!(
        putaway(&h, &detail, "P-1", "A-01").await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected type value is PUTAWAY but got UNLOADING"
    );

    // A claim pushed back out of PUTTING_AWAY can't be moved.
    let claim = h.reload_target(target.id).await.unwrap();
    let mut pushed_back: order_inventory::ActiveModel = claim.clone().into();
    pushed_back.status = Set(OrderInventoryStatus::Pending);
    pushed_back.update(h.conn()).await.unwrap();
    assert_matches!(
        putaway(&h, &putaway_detail, "P-1", "A-01").await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected status value is PUTTING_AWAY but got PENDING"
    );
    let mut restored: order_inventory::ActiveModel = claim.into();
    restored.status = Set(OrderInventoryStatus::PuttingAway);
    restored.update(h.conn()).await.unwrap();
    assert_eq!(h.reload_inventory(first.inventory.id).await.location_id, Some(buffer.id));

    assert_matches!(
        putaway(&h, &putaway_detail, "P-9", "A-01").await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected pallet value is P-1 but got P-9"
    );

    let stored = putaway(&h, &putaway_detail, "P-1", "A-01").await.unwrap();
    assert_eq!(stored.inventory.status, InventoryStatus::Stored);
    assert_eq!(stored.inventory.location_id, Some(shelf.id));
    assert_eq!(stored.detail.status, WorksheetStatus::Done);
    assert_eq!(stored.detail.to_location_id, Some(shelf.id));
    assert_eq!(h.reload_location(shelf.id).await.status, LocationStatus::Stored);
    assert_eq!(h.reload_location(buffer.id).await.status, LocationStatus::Empty);
    assert_eq!(h.reload_target(target.id).await.unwrap().status, OrderInventoryStatus::Stored);

    let history = histories(&h, first.inventory.id).await;
    let last = history.last().unwrap();
    assert_eq!(last.transaction_type, InventoryTransactionType::Putaway);
    assert_eq!(last.seq, 2);
    assert_eq!(last.qty_delta, 0);
    assert_eq!(last.location_id, Some(shelf.id));

    CompletePutawayCommand { context: h.ctx, worksheet_no: generated.worksheet.name.clone() }
        .execute(h.db.clone(), h.collaborators.clone())
        .await
        .unwrap();
    assert_eq!(reload_an(&h, an.id).await.status, OrderStatus::Done);
    assert_eq!(h.reload_target(target.id).await.unwrap().status, OrderInventoryStatus::Terminated);

    let completed_types: Vec<Option<String>> = h
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            stateset_worksheets::events::Event::WorksheetCompleted { ref_order_status, .. } => Some(ref_order_status),
            _ => None,
        })
        .collect();
    assert_eq!(
        completed_types,
        vec![Some("READY_TO_PUTAWAY".to_string()), Some("DONE".to_string())]
    );
}

#[tokio::test]
async fn unloading_requires_an_executing_worksheet() {
    let h = TestHarness::new().await;
    let buffer = h.location("BUF-01").await;
    let an = h.arrival_notice("AN-2", OrderStatus::Pending, false).await;
    let product = h.order_product(&an, "OP-2", 5, OrderProductStatus::Pending).await;
    let unloading = generate_unloading(&h, &an, &[&product], buffer.id).await;

    assert_matches!(
        unload(&h, &unloading.details[0].name, "P-1", 5, dec(1000)).await,
        Err(ServiceError::PreconditionViolation(msg)) if msg == "Expected status value is EXECUTING but got DEACTIVATED"
    );
    assert_matches!(
        unload(&h, &unloading.details[0].name, "P-1", 0, dec(1000)).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        unload(&h, "NO-SUCH-DETAIL", "P-1", 5, dec(1000)).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn putaway_needs_a_notice_ready_for_it() {
    let h = TestHarness::new().await;
    h.arrival_notice("AN-3", OrderStatus::Processing, false).await;

    let result = GeneratePutawayCommand { context: h.ctx, arrival_notice_no: "AN-3".to_string() }
        .execute(h.db.clone(), h.collaborators.clone())
        .await;
    assert_matches!(
        result,
        Err(ServiceError::NotFound(msg))
            if msg == "There's no results matched with condition ARRIVAL_NOTICE name: AN-3, status: READY_TO_PUTAWAY"
    );
}

#[tokio::test]
async fn cross_docked_notice_starts_its_picking() {
    let h = TestHarness::new().await;
    let buffer = h.location("BUF-01").await;
    let an = h.arrival_notice("AN-X", OrderStatus::Pending, true).await;
    let product = h.order_product(&an, "OP-X", 40, OrderProductStatus::Pending).await;
    let release = h.release_good("RG-X", OrderStatus::Pending, true, Some(an.id)).await;
    let claim = h
        .release_target(&release, "OI-X", None, 30, dec(6000), OrderInventoryStatus::Pending)
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

    let unloading = generate_unloading(&h, &an, &[&product], buffer.id).await;
    ActivateUnloadingCommand {
        context: h.ctx,
        worksheet_no: unloading.worksheet.name.clone(),
        pallet_patches: vec![],
        changed_details: vec![],
    }
    .execute(h.db.clone(), h.collaborators.clone())
    .await
    .unwrap();

    let picking_ws = worksheet::Entity::find_by_id(picking.worksheet.id).one(h.conn()).await.unwrap().unwrap();
    assert_eq!(picking_ws.status, WorksheetStatus::Executing);
    assert_eq!(h.reload_target(claim.id).await.unwrap().status, OrderInventoryStatus::Picking);
    assert_eq!(reload_product(&h, product.id).await.pallet_qty, None);
}
