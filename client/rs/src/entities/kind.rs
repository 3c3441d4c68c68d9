use std::fmt;

use serde::{Deserialize, Serialize};

/// Every resource type the executor knows how to dispatch, tagged the
/// same way `PlannedChange::resource_type` tags them on the wire.
///
/// `path_segment` / `parent_kind` describe enough of the platform's REST
/// surface for [`crate::client::StateClient`] to build requests without
/// every resource needing its own named method.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Api,
  ApiVersion,
  ApiPublication,
  ApiImplementation,
  ApiDocument,
  Portal,
  PortalCustomDomain,
  PortalPage,
  PortalSnippet,
  PortalTeam,
  PortalTeamRole,
  PortalEmailConfig,
  PortalEmailTemplate,
  PortalCustomization,
  PortalAuthSettings,
  PortalImageLogo,
  PortalImageFavicon,
  ApplicationAuthStrategy,
  ControlPlane,
  EventGatewayControlPlane,
  EventGatewayBackendCluster,
  EventGatewayVirtualCluster,
  OrganizationTeam,
  CatalogService,
  GatewayService,
}

impl ResourceKind {
  /// Parses the `resource_type` tag carried on a `PlannedChange`.
  pub fn from_tag(tag: &str) -> Option<Self> {
    Some(match tag {
      "api" => Self::Api,
      "api_version" => Self::ApiVersion,
      "api_publication" | "publication" => Self::ApiPublication,
      "api_implementation" | "implementation" => {
        Self::ApiImplementation
      }
      "api_document" | "document" => Self::ApiDocument,
      "portal" => Self::Portal,
      "portal_custom_domain" | "custom_domain" => {
        Self::PortalCustomDomain
      }
      "portal_page" | "page" => Self::PortalPage,
      "portal_snippet" | "snippet" => Self::PortalSnippet,
      "portal_team" => Self::PortalTeam,
      "portal_team_role" | "team_role" => Self::PortalTeamRole,
      "portal_email_config" => Self::PortalEmailConfig,
      "portal_email_template" => Self::PortalEmailTemplate,
      "portal_customization" => Self::PortalCustomization,
      "portal_auth_settings" => Self::PortalAuthSettings,
      "portal_asset_logo" => Self::PortalImageLogo,
      "portal_asset_favicon" => Self::PortalImageFavicon,
      "application_auth_strategy" | "auth_strategy" => {
        Self::ApplicationAuthStrategy
      }
      "control_plane" => Self::ControlPlane,
      "event_gateway_control_plane" => {
        Self::EventGatewayControlPlane
      }
      "event_gateway_backend_cluster" | "backend_cluster" => {
        Self::EventGatewayBackendCluster
      }
      "event_gateway_virtual_cluster" | "virtual_cluster" => {
        Self::EventGatewayVirtualCluster
      }
      "organization_team" => Self::OrganizationTeam,
      "catalog_service" => Self::CatalogService,
      "gateway_service" => Self::GatewayService,
      _ => return None,
    })
  }

  pub fn as_tag(self) -> &'static str {
    match self {
      Self::Api => "api",
      Self::ApiVersion => "api_version",
      Self::ApiPublication => "api_publication",
      Self::ApiImplementation => "api_implementation",
      Self::ApiDocument => "api_document",
      Self::Portal => "portal",
      Self::PortalCustomDomain => "portal_custom_domain",
      Self::PortalPage => "portal_page",
      Self::PortalSnippet => "portal_snippet",
      Self::PortalTeam => "portal_team",
      Self::PortalTeamRole => "portal_team_role",
      Self::PortalEmailConfig => "portal_email_config",
      Self::PortalEmailTemplate => "portal_email_template",
      Self::PortalCustomization => "portal_customization",
      Self::PortalAuthSettings => "portal_auth_settings",
      Self::PortalImageLogo => "portal_asset_logo",
      Self::PortalImageFavicon => "portal_asset_favicon",
      Self::ApplicationAuthStrategy => "application_auth_strategy",
      Self::ControlPlane => "control_plane",
      Self::EventGatewayControlPlane => {
        "event_gateway_control_plane"
      }
      Self::EventGatewayBackendCluster => {
        "event_gateway_backend_cluster"
      }
      Self::EventGatewayVirtualCluster => {
        "event_gateway_virtual_cluster"
      }
      Self::OrganizationTeam => "organization_team",
      Self::CatalogService => "catalog_service",
      Self::GatewayService => "gateway_service",
    }
  }

  /// The top-level collection path segment on the platform API, relative
  /// to either the API root or the parent resource's path.
  pub fn path_segment(self) -> &'static str {
    match self {
      Self::Api => "apis",
      Self::ApiVersion => "versions",
      Self::ApiPublication => "publications",
      Self::ApiImplementation => "implementations",
      Self::ApiDocument => "documents",
      Self::Portal => "portals",
      Self::PortalCustomDomain => "custom-domains",
      Self::PortalPage => "pages",
      Self::PortalSnippet => "snippets",
      Self::PortalTeam => "teams",
      Self::PortalTeamRole => "roles",
      Self::PortalEmailConfig => "email-config",
      Self::PortalEmailTemplate => "email-templates",
      Self::PortalCustomization => "customization",
      Self::PortalAuthSettings => "auth-settings",
      Self::PortalImageLogo => "logo",
      Self::PortalImageFavicon => "favicon",
      Self::ApplicationAuthStrategy => "application-auth-strategies",
      Self::ControlPlane => "control-planes",
      Self::EventGatewayControlPlane => {
        "event-gateway-control-planes"
      }
      Self::EventGatewayBackendCluster => "backend-clusters",
      Self::EventGatewayVirtualCluster => "virtual-clusters",
      Self::OrganizationTeam => "teams",
      Self::CatalogService => "catalog-services",
      Self::GatewayService => "gateway-services",
    }
  }

  /// The resource kind whose id must prefix this one's path, if any.
  pub fn parent_kind(self) -> Option<Self> {
    match self {
      Self::ApiVersion
      | Self::ApiPublication
      | Self::ApiImplementation
      | Self::ApiDocument => Some(Self::Api),
      Self::PortalCustomDomain
      | Self::PortalPage
      | Self::PortalSnippet
      | Self::PortalTeam
      | Self::PortalEmailConfig
      | Self::PortalEmailTemplate
      | Self::PortalCustomization
      | Self::PortalAuthSettings
      | Self::PortalImageLogo
      | Self::PortalImageFavicon => Some(Self::Portal),
      Self::PortalTeamRole => Some(Self::PortalTeam),
      Self::EventGatewayBackendCluster
      | Self::EventGatewayVirtualCluster => {
        Some(Self::EventGatewayControlPlane)
      }
      Self::GatewayService => Some(Self::ControlPlane),
      _ => None,
    }
  }

  /// Singleton children have no id of their own; their identity is
  /// `(parent_id, kind)`. [`crate::client::StateClient`] and the
  /// executor's singleton flow both special-case these.
  pub fn is_singleton(self) -> bool {
    matches!(
      self,
      Self::PortalCustomization
        | Self::PortalAuthSettings
        | Self::PortalImageLogo
        | Self::PortalImageFavicon
    )
  }

  /// True for resources the platform exposes without an UPDATE operation.
  pub fn is_create_delete_only(self) -> bool {
    matches!(self, Self::ApiPublication)
  }

  /// True for resources a by-name lookup makes sense for (used by
  /// pre-execution existence checks and the reference resolver).
  pub fn supports_name_lookup(self) -> bool {
    !matches!(
      self,
      Self::ApiPublication
        | Self::PortalCustomization
        | Self::PortalAuthSettings
        | Self::PortalImageLogo
        | Self::PortalImageFavicon
    )
  }

  /// False for kinds the dispatch table names but which this platform
  /// surface does not actually expose yet ("declared but unimplemented",
  /// per the spec's own guidance on portal snippets and API
  /// implementations). Checked during pre-validation so dry-run predicts
  /// the same outcome a real run would produce.
  pub fn is_supported(self) -> bool {
    !matches!(
      self,
      Self::PortalSnippet | Self::ApiImplementation
    )
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_tag())
  }
}
