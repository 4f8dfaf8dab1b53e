//! Tagwarden Gateway: external collaborator contracts
//!
//! This crate defines the boundary between the policy engines and the
//! outside world: the compute/storage control plane, the notification
//! channel, and the DNS control plane.
//!
//! ## Layer 0 - Gateways
//!
//! Focus: narrow async contracts, plus adapters and fakes that honour them.
//!
//! ## Key Components
//!
//! - `ResourceGateway` / `InstanceGateway`: volumes and instances
//! - `NotificationGateway`: publish subject + body to a named channel
//! - `DnsZoneGateway` / `CredentialStrategy`: hosted zone records
//! - `FileInventory` / `OutboxNotifier`: file-backed local adapters, with
//!   `InventoryCredential` resolving one principal's DNS view
//! - `fakes`: in-memory implementations with failure injection

mod error;
pub mod fakes;
pub mod gateway_traits;
pub mod inventory;
pub mod outbox;

pub use error::GatewayError;
pub use gateway_traits::{
    find_tag, upsert_tag, ChannelHandle, CredentialStrategy, DnsZoneGateway, GatewayResult,
    HostedZone, Instance, InstanceGateway, NotificationGateway, RecordSet, RecordType, Resource,
    ResourceGateway, Tag,
};
pub use inventory::{
    FileDnsView, FileInventory, InventoryCredential, InventoryDocument, VolumeRecord, ZoneRecord,
    LOCAL_PRINCIPAL,
};
pub use outbox::{OutboxMessage, OutboxNotifier};
