// SPDX-FileCopyrightText: 2026 Fleetlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform bit flags for item searches and report statuses.

/// Item data flags selecting which properties a search returns.
pub mod data {
    pub const BASE: u64 = 0x0000_0001;
    pub const CUSTOM_PROPERTIES: u64 = 0x0000_0002;
    pub const CUSTOM_FIELDS: u64 = 0x0000_0008;
    pub const ADMIN_FIELDS: u64 = 0x0000_0080;
    pub const HARDWARE: u64 = 0x0000_0100;
    pub const LAST_MESSAGE: u64 = 0x0000_0400;
    pub const SENSORS: u64 = 0x0000_1000;
    pub const REPORT_TEMPLATES: u64 = 0x0000_2000;
    pub const PROFILE_FIELDS: u64 = 0x0080_0000;

    /// Everything the snapshot needs about a unit.
    pub const UNIT_SNAPSHOT: u64 = BASE
        | CUSTOM_PROPERTIES
        | CUSTOM_FIELDS
        | ADMIN_FIELDS
        | HARDWARE
        | LAST_MESSAGE
        | PROFILE_FIELDS;
}

/// Item type names accepted by `core/search_items`.
pub mod items {
    pub const UNIT: &str = "avl_unit";
    pub const USER: &str = "user";
    pub const RESOURCE: &str = "avl_resource";
    pub const UNIT_GROUP: &str = "avl_unit_group";
}

/// Values reported by `report/get_report_status`.
pub mod report_status {
    pub const QUEUED: u32 = 1;
    pub const RUNNING: u32 = 2;
    pub const COMPLETED: u32 = 4;
    pub const CANCELED: u32 = 8;
    pub const INVALID: u32 = 16;
}

/// `core/batch` flag: stop executing after the first failing command.
pub const BATCH_STOP_ON_ERROR: u32 = 1;

/// `messages/load_interval` flags selecting every message type.
pub const MESSAGES_ALL: u64 = 0;
pub const MESSAGES_ALL_MASK: u64 = 0;
