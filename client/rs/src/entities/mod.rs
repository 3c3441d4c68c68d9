pub mod action;
pub mod kind;
pub mod labels;
pub mod plan;
pub mod reference;
pub mod remote;

pub use action::Action;
pub use kind::ResourceKind;
pub use labels::{
  LABEL_LAST_UPDATED, LABEL_MANAGED, LABEL_NAMESPACE, LABEL_PROTECTED,
  LabelPatch, Labels, RESERVED_LABEL_KEYS, extract_labels_from_value,
  is_kongctl_label,
};
pub use plan::{
  ExternalToolSpec, GatewayServiceDeclaration, ParentRef, Plan,
  PlanMetadata, PlanMode, PlannedChange, Protection,
};
pub use reference::{
  ParsedReference, ReferenceInfo, format_placeholder, is_unresolved,
  parse_reference,
};
pub use remote::RemoteResource;
