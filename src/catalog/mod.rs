//! Catalogue of supported resource types.
//!
//! Each type is a static [`ResourceType`] table. Adding a type means adding
//! a table here; the reconciliation core needs no changes.

use reconcile::{FieldKind, FieldSpec, ListOrder, Modifier, ResourceType, TextMatch};

/// Prefix a provider path with the resource-group scope.
macro_rules! rg_scoped {
    ($suffix:literal) => {
        concat!(
            "/subscriptions/{subscription_id}/resourceGroups/{resource_group}",
            $suffix
        )
    };
}

mod compute;
mod network;
mod resources;

const LOCATION: FieldSpec = FieldSpec::new("location", "/location", FieldKind::STRING)
    .modifier(Modifier::LOCATION)
    .required()
    .help("Azure region; cannot change after creation");

const TAGS: FieldSpec = FieldSpec::new("tags", "/tags", FieldKind::Object)
    .help("Tags to ensure; tags not listed are left alone");

/// Resource IDs differ in casing between what callers write and what ARM returns.
const RESOURCE_ID: Modifier = Modifier::DEFAULT.with_text(TextMatch::IgnoreCase);

const UNORDERED: Modifier = Modifier::DEFAULT.with_list_order(ListOrder::Unordered);

/// Every supported type, in display order.
pub const TYPES: &[&ResourceType] = &[
    &resources::RESOURCE_GROUP,
    &resources::SUBSCRIPTION,
    &resources::SUBSCRIPTION_TAGS,
    &compute::AVAILABILITY_SET,
    &compute::PROXIMITY_PLACEMENT_GROUP,
    &compute::GALLERY,
    &compute::GALLERY_IMAGE,
    &compute::SNAPSHOT,
    &network::VIRTUAL_NETWORK,
    &network::SUBNET,
    &network::ROUTE_TABLE,
];

/// Look up a type by name. `-` and `_` are interchangeable.
pub fn find(name: &str) -> Option<&'static ResourceType> {
    let wanted = name.trim().to_ascii_lowercase().replace('-', "_");
    TYPES.iter().copied().find(|t| t.name == wanted)
}

/// Names of all types, for error messages.
pub fn names() -> Vec<&'static str> {
    TYPES.iter().map(|t| t.name).collect()
}
