//! Column registry and the ordered, visibility-tagged column model.

use serde_json::Value;

use crate::record::{Record, scalar_text};

/// Canonical render order of a fresh result set.
pub const CANONICAL_COLUMNS: [&str; 34] = [
    "office_name",
    "batch_no",
    "customer",
    "type",
    "reference_number",
    "booking_number",
    "bol_number",
    "po_number",
    "container_number",
    "container_size",
    "container_type",
    "pickup_location_name",
    "delivery_location_name",
    "delivery_street_address",
    "delivery_city",
    "delivery_state",
    "delivery_zip",
    "return_location",
    "container_weight",
    "commodity",
    "number_of_packages",
    "eta_date",
    "steam_ship_line",
    "vessel",
    "voyage",
    "cut_off_date",
    "early_release_date",
    "seal",
    "pickup_number",
    "pickup_appointment_date_time",
    "delivery_appointment_date_time",
    "Options",
    "Tags",
    "Notes",
];

const DISPLAY_NAMES: [(&str, &str); 34] = [
    ("office_name", "Office"),
    ("batch_no", "Batch no"),
    ("customer", "Customer"),
    ("type", "I/E"),
    ("reference_number", "Reference#"),
    ("booking_number", "Booking#"),
    ("bol_number", "BOL#"),
    ("po_number", "PO#"),
    ("container_number", "Container#"),
    ("container_size", "Size"),
    ("container_type", "Type"),
    ("pickup_location_name", "Pickup Location"),
    ("delivery_location_name", "Shipper/Consignee"),
    ("delivery_street_address", "Street"),
    ("delivery_city", "City"),
    ("delivery_state", "State"),
    ("delivery_zip", "Zip"),
    ("return_location", "Return Location"),
    ("container_weight", "Weight"),
    ("commodity", "Commodity"),
    ("number_of_packages", "#Pkgs"),
    ("eta_date", "ETA"),
    ("steam_ship_line", "SSL"),
    ("vessel", "Vessel"),
    ("voyage", "Voyage"),
    ("cut_off_date", "LFD/Cut-off"),
    ("early_release_date", "ERD"),
    ("seal", "Seal"),
    ("pickup_number", "Pickup#"),
    ("pickup_appointment_date_time", "Port/Rail Appt. Date/Time"),
    ("delivery_appointment_date_time", "Cust Appt. Date/Time"),
    ("Options", "Options"),
    ("Tags", "Tags"),
    ("Notes", "Quick Notes"),
];

// Legacy field names. Entries chain: an alias may itself have aliases.
const ALIASES: [(&str, &[&str]); 6] = [
    ("office_name", &["office"]),
    ("office", &["branch"]),
    ("container_number", &["container_no"]),
    ("steam_ship_line", &["ssl"]),
    ("Notes", &["notes"]),
    ("notes", &["quick_notes"]),
];

pub fn aliases(name: &str) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Looks a column up in a record: the column id itself, then its aliases,
/// then the aliases of those aliases. Absent, null and empty fields fall through.
pub fn resolve<'r>(record: &'r Record, column_id: &str) -> Option<&'r Value> {
    let present = |field: &str| record.get(field).filter(|v| scalar_text(v).is_some());

    if let Some(value) = present(column_id) {
        return Some(value);
    }
    let first_tier = aliases(column_id);
    if let Some(value) = first_tier.iter().find_map(|alias| present(alias)) {
        return Some(value);
    }
    first_tier
        .iter()
        .flat_map(|alias| aliases(alias).iter())
        .find_map(|alias| present(alias))
}

pub fn resolve_text(record: &Record, column_id: &str) -> String {
    resolve(record, column_id)
        .and_then(scalar_text)
        .unwrap_or_default()
}

pub fn display_name(column_id: &str) -> String {
    DISPLAY_NAMES
        .iter()
        .find(|(id, _)| *id == column_id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| default_display_name(column_id))
}

fn default_display_name(column_id: &str) -> String {
    column_id
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub id: String,
    pub display_name: String,
    pub visible: bool,
}

impl ColumnDescriptor {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name(id),
            visible: true,
        }
    }
}

/// Ordered column descriptors. The order is the render order. Mutation is
/// crate-private and goes through `ShipmentTable`, which keeps the grid in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModel {
    columns: Vec<ColumnDescriptor>,
}

impl Default for ColumnModel {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ColumnModel {
    pub fn canonical() -> Self {
        Self::from_ids(&CANONICAL_COLUMNS)
    }

    pub fn from_ids(ids: &[&str]) -> Self {
        Self {
            columns: ids.iter().map(|id| ColumnDescriptor::new(id)).collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn ids(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn visible_ids(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.visible)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn get(&self, column_id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn position(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Removes `source` and re-inserts it at the index `target` held before the
    /// removal, shifting the target and everything after it.
    pub(crate) fn move_before(&mut self, source: &str, target: &str) -> bool {
        if source == target {
            return false;
        }
        let (Some(source_idx), Some(target_idx)) = (self.position(source), self.position(target))
        else {
            return false;
        };
        let column = self.columns.remove(source_idx);
        self.columns.insert(target_idx, column);
        true
    }

    pub(crate) fn set_visible(&mut self, column_id: &str, visible: bool) -> bool {
        match self.columns.iter_mut().find(|c| c.id == column_id) {
            Some(column) => {
                column.visible = visible;
                true
            }
            None => false,
        }
    }
}
