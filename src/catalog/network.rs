//! Microsoft.Network: virtual networks, subnets and route tables.
//!
//! The network provider only PATCHes tags, so updates PUT the observed
//! document back with the desired properties overlaid. Child collections
//! the caller did not mention (subnets of a network, routes managed
//! elsewhere) survive the round trip.

use super::{LOCATION, RESOURCE_ID, TAGS, UNORDERED};
use reconcile::{FieldKind, FieldSpec, ListOrder, Modifier, PathTemplate, ResourceType, WriteMode};

const VIRTUAL_NETWORK_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new(
        "address_prefixes",
        "/properties/addressSpace/addressPrefixes",
        FieldKind::List,
    )
    .modifier(UNORDERED)
    .required()
    .help("CIDR blocks, e.g. [\"10.0.0.0/16\"]"),
    FieldSpec::new(
        "dns_servers",
        "/properties/dhcpOptions/dnsServers",
        FieldKind::List,
    )
    .help("Custom DNS servers, in resolution order"),
    FieldSpec::new(
        "enable_ddos_protection",
        "/properties/enableDdosProtection",
        FieldKind::Bool,
    ),
    FieldSpec::new(
        "flow_timeout_in_minutes",
        "/properties/flowTimeoutInMinutes",
        FieldKind::Integer,
    ),
];

pub const VIRTUAL_NETWORK: ResourceType = ResourceType {
    name: "virtual_network",
    description: "Virtual network",
    api_version: "2023-09-01",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Network/virtualNetworks/{name}"
    )),
    fields: VIRTUAL_NETWORK_FIELDS,
    write_mode: WriteMode::Replace,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

const SUBNET_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(
        "address_prefix",
        "/properties/addressPrefix",
        FieldKind::String {
            pattern: Some(r"^[0-9a-fA-F:.]+/\d{1,3}$"),
        },
    )
    .required()
    .help("CIDR block inside the network's address space"),
    FieldSpec::new(
        "network_security_group",
        "/properties/networkSecurityGroup/id",
        FieldKind::STRING,
    )
    .modifier(RESOURCE_ID)
    .help("Resource ID of a network security group"),
    FieldSpec::new("route_table", "/properties/routeTable/id", FieldKind::STRING)
        .modifier(RESOURCE_ID)
        .help("Resource ID of a route table"),
    FieldSpec::new(
        "service_endpoints",
        "/properties/serviceEndpoints",
        FieldKind::List,
    )
    .modifier(UNORDERED)
    .help("[{service: \"Microsoft.Storage\"}]"),
    FieldSpec::new(
        "private_endpoint_network_policies",
        "/properties/privateEndpointNetworkPolicies",
        FieldKind::Choice(&["Enabled", "Disabled"]),
    ),
    FieldSpec::new("delegations", "/properties/delegations", FieldKind::List)
        .modifier(UNORDERED),
];

pub const SUBNET: ResourceType = ResourceType {
    name: "subnet",
    description: "Subnet of a virtual network",
    api_version: "2023-09-01",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Network/virtualNetworks/{virtual_network_name}/subnets/{name}"
    )),
    fields: SUBNET_FIELDS,
    write_mode: WriteMode::Replace,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};

const ROUTE_TABLE_FIELDS: &[FieldSpec] = &[
    LOCATION,
    TAGS,
    FieldSpec::new(
        "disable_bgp_route_propagation",
        "/properties/disableBgpRoutePropagation",
        FieldKind::Bool,
    ),
    FieldSpec::new("routes", "/properties/routes", FieldKind::List)
        .modifier(Modifier::DEFAULT.with_list_order(ListOrder::Unordered))
        .help("[{name, properties: {addressPrefix, nextHopType, nextHopIpAddress}}]"),
];

pub const ROUTE_TABLE: ResourceType = ResourceType {
    name: "route_table",
    description: "Route table",
    api_version: "2023-09-01",
    path_template: PathTemplate(rg_scoped!(
        "/providers/Microsoft.Network/routeTables/{name}"
    )),
    fields: ROUTE_TABLE_FIELDS,
    write_mode: WriteMode::Replace,
    info_only: false,
    default_list_order: ListOrder::Ordered,
};
