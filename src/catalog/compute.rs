//! Microsoft.Compute: availability sets, placement groups, galleries and snapshots.

use super::{LOCATION, RESOURCE_ID, TAGS, UNORDERED};
use reconcile::{
    FieldKind, FieldSpec, ListOrder, Modifier, PathTemplate, ResourceType, TextMatch, WriteMode,
};

const AVAILABILITY_SET_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new(
        "platform_fault_domain_count",
        "/properties/platformFaultDomainCount",
        FieldKind::Integer,
    )
    .modifier(Modifier::IMMUTABLE)
    .help("Fault domains (1-3)"),
    FieldSpec::new(
        "platform_update_domain_count",
        "/properties/platformUpdateDomainCount",
        FieldKind::Integer,
    )
    .modifier(Modifier::IMMUTABLE)
    .help("Update domains (1-20)"),
    FieldSpec::new("sku", "/sku/name", FieldKind::Choice(&["Classic", "Aligned"]))
        .help("Aligned for managed disks"),
    FieldSpec::new(
        "proximity_placement_group",
        "/properties/proximityPlacementGroup/id",
        FieldKind::STRING,
    )
    .modifier(RESOURCE_ID)
    .help("Resource ID of a proximity placement group"),
];

pub const AVAILABILITY_SET: ResourceType = ResourceType {
    name: "availability_set",
    description: "Availability set",
    api_version: "2023-03-01",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Compute/availabilitySets/{name}"
    )),
    fields: AVAILABILITY_SET_FIELDS,
    write_mode: WriteMode::Standard,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

const PROXIMITY_PLACEMENT_GROUP_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new(
        "group_type",
        "/properties/proximityPlacementGroupType",
        FieldKind::Choice(&["Standard", "Ultra"]),
    )
    .modifier(Modifier::IMMUTABLE),
    FieldSpec::new("zones", "/zones", FieldKind::List)
        .modifier(Modifier::IMMUTABLE.with_list_order(ListOrder::Unordered))
        .help("Availability zone, at most one"),
    FieldSpec::new("vm_sizes", "/properties/intent/vmSizes", FieldKind::List)
        .modifier(UNORDERED)
        .help("VM sizes intended for the group"),
];

pub const PROXIMITY_PLACEMENT_GROUP: ResourceType = ResourceType {
    name: "proximity_placement_group",
    description: "Proximity placement group",
    api_version: "2023-03-01",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Compute/proximityPlacementGroups/{name}"
    )),
    fields: PROXIMITY_PLACEMENT_GROUP_FIELDS,
    write_mode: WriteMode::Standard,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

const GALLERY_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new("description", "/properties/description", FieldKind::STRING),
    FieldSpec::new(
        "sharing_permission",
        "/properties/sharingProfile/permissions",
        FieldKind::Choice(&["Private", "Groups", "Community"]),
    ),
    FieldSpec::new(
        "soft_delete",
        "/properties/softDeletePolicy/isSoftDeleteEnabled",
        FieldKind::Bool,
    )
    .help("Keep deleted images recoverable"),
];

pub const GALLERY: ResourceType = ResourceType {
    name: "gallery",
    description: "Azure Compute Gallery",
    api_version: "2022-03-03",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Compute/galleries/{name}"
    )),
    fields: GALLERY_FIELDS,
    write_mode: WriteMode::Standard,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

const GALLERY_IMAGE_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new("description", "/properties/description", FieldKind::STRING),
    FieldSpec::new(
        "os_type",
        "/properties/osType",
        FieldKind::Choice(&["Windows", "Linux"]),
    )
    .modifier(Modifier::IMMUTABLE)
    .required(),
    FieldSpec::new(
        "os_state",
        "/properties/osState",
        FieldKind::Choice(&["Generalized", "Specialized"]),
    )
    .modifier(Modifier::IMMUTABLE)
    .required(),
    FieldSpec::new(
        "hyper_v_generation",
        "/properties/hyperVGeneration",
        FieldKind::Choice(&["V1", "V2"]),
    )
    .modifier(Modifier::IMMUTABLE),
    FieldSpec::new(
        "architecture",
        "/properties/architecture",
        FieldKind::Choice(&["x64", "Arm64"]),
    )
    .modifier(Modifier::IMMUTABLE),
    FieldSpec::new("identifier", "/properties/identifier", FieldKind::Object)
        .modifier(Modifier::IMMUTABLE)
        .required()
        .help("{publisher, offer, sku}"),
    FieldSpec::new("eula", "/properties/eula", FieldKind::STRING),
    FieldSpec::new(
        "privacy_statement_uri",
        "/properties/privacyStatementUri",
        FieldKind::STRING,
    ),
    FieldSpec::new(
        "release_note_uri",
        "/properties/releaseNoteUri",
        FieldKind::STRING,
    ),
    FieldSpec::new(
        "end_of_life_date",
        "/properties/endOfLifeDate",
        FieldKind::String {
            pattern: Some(r"^\d{4}-\d{2}-\d{2}(T[\d:.]+Z?)?$"),
        },
    )
    .help("ISO 8601 date"),
    FieldSpec::new("recommended", "/properties/recommended", FieldKind::Object)
        .help("{vCPUs: {min, max}, memory: {min, max}}"),
    FieldSpec::new("features", "/properties/features", FieldKind::List)
        .modifier(Modifier::IMMUTABLE.with_list_order(ListOrder::Unordered))
        .help("[{name, value}]"),
];

pub const GALLERY_IMAGE: ResourceType = ResourceType {
    name: "gallery_image",
    description: "Gallery image definition",
    api_version: "2022-03-03",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Compute/galleries/{gallery_name}/images/{name}"
    )),
    fields: GALLERY_IMAGE_FIELDS,
    write_mode: WriteMode::Standard,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

const SNAPSHOT_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new(
        "sku",
        "/sku/name",
        FieldKind::Choice(&["Standard_LRS", "Premium_LRS", "Standard_ZRS"]),
    ),
    FieldSpec::new(
        "os_type",
        "/properties/osType",
        FieldKind::Choice(&["Windows", "Linux"]),
    )
    .modifier(Modifier::IMMUTABLE),
    FieldSpec::new("creation_data", "/properties/creationData", FieldKind::Object)
        .modifier(Modifier::IMMUTABLE.with_text(TextMatch::IgnoreCase))
        .required()
        .help("{createOption, sourceResourceId | sourceUri | ...}"),
    FieldSpec::new("disk_size_gb", "/properties/diskSizeGB", FieldKind::Integer)
        .help("Can only grow"),
    FieldSpec::new("incremental", "/properties/incremental", FieldKind::Bool)
        .modifier(Modifier::IMMUTABLE),
    FieldSpec::new(
        "network_access_policy",
        "/properties/networkAccessPolicy",
        FieldKind::Choice(&["AllowAll", "AllowPrivate", "DenyAll"]),
    ),
    FieldSpec::new(
        "public_network_access",
        "/properties/publicNetworkAccess",
        FieldKind::Choice(&["Enabled", "Disabled"]),
    ),
];

pub const SNAPSHOT: ResourceType = ResourceType {
    name: "snapshot",
    description: "Managed disk snapshot",
    api_version: "2023-04-02",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Compute/snapshots/{name}"
    )),
    fields: SNAPSHOT_FIELDS,
    write_mode: WriteMode::Standard,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};
