//! Representative node catalogue: specs, param checkers and typed wrappers
//! for the Marketing API objects the client ships with.

/// Typed wrapper over [`CrudNode`] for one node type.
macro_rules! node_type {
    ($(#[$meta:meta])* $name:ident, $spec:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(crate::crud::CrudNode);

        impl $name {
            pub fn new(api: crate::api::GraphApi, id: impl Into<String>) -> Self {
                Self(crate::crud::CrudNode::new(api, &$spec, id))
            }

            pub fn into_node(self) -> crate::crud::CrudNode {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = crate::crud::CrudNode;

            fn deref(&self) -> &crate::crud::CrudNode {
                &self.0
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut crate::crud::CrudNode {
                &mut self.0
            }
        }
    };
}

mod ad;
mod ad_account;
mod ad_creative;
mod ad_set;
mod ads_insights;
mod campaign;
mod common;

use http_transport::HttpMethod;

use crate::crud::{CallOutcome, CrudNode, RequestMode, dispatch};
use crate::errors::GraphApiResult;
use crate::object::ObjectSpec;
use crate::params::Params;
use crate::type_checker::ParamChecker;

pub use ad::{AD, Ad};
pub use ad_account::{AD_ACCOUNT, AdAccount};
pub use ad_creative::{AD_CREATIVE, AdCreative};
pub use ad_set::{AD_SET, AdSet};
pub use ads_insights::{AD_REPORT_RUN, ADS_INSIGHTS};
pub use campaign::{CAMPAIGN, Campaign};
pub use common::{AD_LABEL, TARGETING};

static CATALOGUE: &[&ObjectSpec] = &[
    &AD,
    &AD_ACCOUNT,
    &AD_CREATIVE,
    &AD_LABEL,
    &AD_REPORT_RUN,
    &AD_SET,
    &ADS_INSIGHTS,
    &CAMPAIGN,
    &TARGETING,
];

/// Looks up a node type by name; used to decode nested objects.
pub fn spec_for(type_name: &str) -> Option<&'static ObjectSpec> {
    CATALOGUE.iter().copied().find(|spec| spec.type_name == type_name)
}

/// Looks up the node type read through an edge, e.g. `adsets` → `AdSet`.
pub fn spec_for_edge(endpoint: &str) -> Option<&'static ObjectSpec> {
    let endpoint = endpoint.trim_matches('/');
    CATALOGUE
        .iter()
        .copied()
        .find(|spec| spec.endpoint == Some(endpoint))
}

/// Reads an edge with an endpoint-specific checker. `fields: None` sends no
/// `fields` param.
pub(crate) async fn read_edge(
    node: &CrudNode,
    target: &'static ObjectSpec,
    checker: ParamChecker,
    fields: Option<&[String]>,
    params: Params,
    mode: RequestMode<'_>,
) -> GraphApiResult<CallOutcome> {
    let mut request = node
        .edge_request(HttpMethod::Get, target, None)?
        .with_param_checker(checker)
        .with_summary(target.type_name != ADS_INSIGHTS.type_name);
    request.add_params(params);
    if let Some(fields) = fields {
        request.add_fields(fields.iter().cloned());
    }
    dispatch(request, mode).await
}

/// Creates on an edge with an endpoint-specific checker.
pub(crate) async fn create_on_edge(
    node: &CrudNode,
    target: &'static ObjectSpec,
    checker: ParamChecker,
    params: Params,
    mode: RequestMode<'_>,
) -> GraphApiResult<CallOutcome> {
    let mut request = node
        .edge_request(HttpMethod::Post, target, None)?
        .with_param_checker(checker);
    request.add_params(params);
    dispatch(request, mode).await
}
