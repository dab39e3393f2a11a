//! Microsoft.Resources: resource groups, subscriptions and subscription tags.

use super::{LOCATION, TAGS};
use reconcile::{FieldKind, FieldSpec, ListOrder, Modifier, PathTemplate, ResourceType, WriteMode};

const RESOURCE_GROUP_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new("managed_by", "/managedBy", FieldKind::STRING)
        .modifier(Modifier::IMMUTABLE)
        .help("ID of the resource that manages this group"),
];

pub const RESOURCE_GROUP: ResourceType = ResourceType {
    name: "resource_group",
    description: "Resource group",
    api_version: "2021-04-01",
    path_template: PathTemplate("/subscriptions/{subscription_id}/resourcegroups/{name}"),
    fields: RESOURCE_GROUP_FIELDS,
    write_mode: WriteMode::Standard,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

pub const SUBSCRIPTION: ResourceType = ResourceType {
    name: "subscription",
    description: "Subscription (read-only)",
    api_version: "2020-01-01",
    path_template: PathTemplate("/subscriptions/{subscription_id}"),
    fields: &[],
    write_mode: WriteMode::Standard,
    info_only: true,
    default_list_order: ListOrder::Ordered,
};

const SUBSCRIPTION_TAGS_FIELDS: &[FieldSpec] = &[FieldSpec::new(
    "tags",
    "/properties/tags",
    FieldKind::Object,
)
.modifier(Modifier::EXACT)
.required()
.help("Complete tag set of the subscription")];

pub const SUBSCRIPTION_TAGS: ResourceType = ResourceType {
    name: "subscription_tags",
    description: "Tags applied at subscription scope",
    api_version: "2021-04-01",
    path_template: PathTemplate(
        "/subscriptions/{subscription_id}/providers/Microsoft.Resources/tags/default",
    ),
    fields: SUBSCRIPTION_TAGS_FIELDS,
    write_mode: WriteMode::Singleton,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};
