#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use stateset_worksheets::{
    commands::Collaborators,
    config::AppConfig,
    context::OperationContext,
    db::{self, DbPool},
    entities::{
        arrival_notice, inventory, location, order_inventory, order_product, order_vas,
        release_good, vas_order, InventoryStatus, LocationStatus, OrderInventoryStatus,
        OrderProductStatus, OrderStatus, OrderVasStatus, RefOrderKind,
    },
    events::{self, Event},
    naming::SequentialNameGenerator,
    notifications::{InMemoryRecipientDirectory, Notifier, RecipientDirectory},
    services::reference_orders::RefOrderLink,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Weight with two decimal places, e.g. `dec(2550)` is 25.50.
pub fn dec(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// SQLite hands decimals back through f64; compare on two places.
pub fn weight(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// One in-memory database with the schema applied and a tenant to work in.
pub struct TestHarness {
    pub db: Arc<DbPool>,
    pub collaborators: Arc<Collaborators>,
    pub directory: Arc<InMemoryRecipientDirectory>,
    pub events: mpsc::Receiver<Event>,
    pub ctx: OperationContext,
    pub bizplace_id: Uuid,
    pub warehouse_id: Uuid,
}

impl TestHarness {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        // A single connection keeps the in-memory database alive and shared.
        cfg.pool.max_connections = 1;
        cfg.pool.min_connections = 1;
        cfg.run_migrations = true;

        let pool = db::connect(&cfg).await.expect("failed to create test database");

        let (event_sender, events) = events::channel(256);
        let directory = Arc::new(InMemoryRecipientDirectory::new());
        let recipients: Arc<dyn RecipientDirectory> = directory.clone();
        let notifier = Notifier::new(recipients, Arc::new(event_sender.clone()));
        let collaborators = Collaborators::new(
            event_sender,
            Arc::new(SequentialNameGenerator::new()),
            notifier,
        );

        Self {
            db: Arc::new(pool),
            collaborators: Arc::new(collaborators),
            directory,
            events,
            ctx: OperationContext::new(Uuid::new_v4(), Uuid::new_v4()),
            bizplace_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
        }
    }

    pub fn conn(&self) -> &DbPool {
        self.db.as_ref()
    }

    /// Events published so far.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub async fn location(&self, name: &str) -> location::Model {
        let now = Utc::now();
        location::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            warehouse_id: Set(self.warehouse_id),
            name: Set(name.to_string()),
            zone: Set(None),
            status: Set(LocationStatus::Empty),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed location")
    }

    /// A STORED pallet at `location`, which is marked STORED as well.
    pub async fn stored_pallet(
        &self,
        pallet_id: &str,
        qty: i32,
        weight: Decimal,
        location: &location::Model,
    ) -> inventory::Model {
        let inv = self
            .pallet(pallet_id, qty, weight, Some(location), InventoryStatus::Stored)
            .await;
        let mut active: location::ActiveModel = location.clone().into();
        active.status = Set(LocationStatus::Stored);
        active.update(self.conn()).await.expect("failed to mark location");
        inv
    }

    pub async fn pallet(
        &self,
        pallet_id: &str,
        qty: i32,
        weight: Decimal,
        location: Option<&location::Model>,
        status: InventoryStatus,
    ) -> inventory::Model {
        let now = Utc::now();
        inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            pallet_id: Set(pallet_id.to_string()),
            batch_id: Set("BATCH-1".to_string()),
            product_id: Set(product_id()),
            packing_type: Set("BOX".to_string()),
            qty: Set(qty),
            weight: Set(weight),
            locked_qty: Set(0),
            locked_weight: Set(Decimal::ZERO),
            location_id: Set(location.map(|l| l.id)),
            warehouse_id: Set(location.map(|l| l.warehouse_id)),
            status: Set(status),
            last_seq: Set(0),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed inventory")
    }

    pub async fn arrival_notice(
        &self,
        name: &str,
        status: OrderStatus,
        cross_docking: bool,
    ) -> arrival_notice::Model {
        let now = Utc::now();
        arrival_notice::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name.to_string()),
            ref_no: Set(None),
            status: Set(status),
            cross_docking: Set(cross_docking),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed arrival notice")
    }

    pub async fn release_good(
        &self,
        name: &str,
        status: OrderStatus,
        cross_docking: bool,
        arrival_notice_id: Option<Uuid>,
    ) -> release_good::Model {
        let now = Utc::now();
        release_good::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name.to_string()),
            ref_no: Set(None),
            status: Set(status),
            cross_docking: Set(cross_docking),
            arrival_notice_id: Set(arrival_notice_id),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed release good")
    }

    pub async fn vas_order(&self, name: &str, status: OrderStatus) -> vas_order::Model {
        let now = Utc::now();
        vas_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name.to_string()),
            status: Set(status),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed vas order")
    }

    pub async fn order_product(
        &self,
        arrival_notice: &arrival_notice::Model,
        name: &str,
        pack_qty: i32,
        status: OrderProductStatus,
    ) -> order_product::Model {
        let now = Utc::now();
        order_product::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name.to_string()),
            arrival_notice_id: Set(arrival_notice.id),
            product_id: Set(product_id()),
            batch_id: Set("BATCH-1".to_string()),
            packing_type: Set("BOX".to_string()),
            pack_qty: Set(pack_qty),
            actual_pack_qty: Set(0),
            pallet_qty: Set(None),
            actual_pallet_qty: Set(0),
            weight: Set(Decimal::ZERO),
            status: Set(status),
            remark: Set(None),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed order product")
    }

    pub async fn order_vas(
        &self,
        ref_order: RefOrderLink,
        name: &str,
        status: OrderVasStatus,
    ) -> order_vas::Model {
        let now = Utc::now();
        order_vas::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name.to_string()),
            ref_order_kind: Set(ref_order.kind),
            ref_order_id: Set(ref_order.id),
            service: Set("RELABEL".to_string()),
            inventory_id: Set(None),
            qty: Set(1),
            weight: Set(Decimal::ZERO),
            status: Set(status),
            remark: Set(None),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed order vas")
    }

    /// A claim of `qty`/`weight` on a release good, optionally bound to `inventory`.
    #[allow(clippy::too_many_arguments)]
    pub async fn release_target(
        &self,
        release_good: &release_good::Model,
        name: &str,
        inventory: Option<&inventory::Model>,
        qty: i32,
        weight: Decimal,
        status: OrderInventoryStatus,
    ) -> order_inventory::Model {
        let now = Utc::now();
        order_inventory::ActiveModel {
            id: Set(Uuid::new_v4()),
            domain_id: Set(self.ctx.domain_id),
            bizplace_id: Set(self.bizplace_id),
            name: Set(name.to_string()),
            ref_order_kind: Set(RefOrderKind::ReleaseGood),
            ref_order_id: Set(release_good.id),
            inventory_id: Set(inventory.map(|i| i.id)),
            delivery_order_id: Set(None),
            product_id: Set(Some(product_id())),
            batch_id: Set(Some("BATCH-1".to_string())),
            packing_type: Set(Some("BOX".to_string())),
            release_qty: Set(qty),
            release_weight: Set(weight),
            inspected_qty: Set(None),
            inspected_weight: Set(None),
            inspected_location_id: Set(None),
            cross_docking: Set(release_good.cross_docking),
            status: Set(status),
            creator_id: Set(self.ctx.user_id),
            updater_id: Set(self.ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn())
        .await
        .expect("failed to seed order inventory")
    }

    pub async fn reload_inventory(&self, id: Uuid) -> inventory::Model {
        inventory::Entity::find_by_id(id)
            .one(self.conn())
            .await
            .expect("failed to load inventory")
            .expect("inventory is gone")
    }

    pub async fn reload_location(&self, id: Uuid) -> location::Model {
        location::Entity::find_by_id(id)
            .one(self.conn())
            .await
            .expect("failed to load location")
            .expect("location is gone")
    }

    pub async fn reload_target(&self, id: Uuid) -> Option<order_inventory::Model> {
        order_inventory::Entity::find_by_id(id)
            .one(self.conn())
            .await
            .expect("failed to load order inventory")
    }
}

/// Every seeded pallet and claim shares one product.
pub fn product_id() -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0001)
}
