use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Remote data prefetched for the home view
///
/// Entries are kept as the site returns them, surfaces render them directly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeData {
  pub account: Value,
  pub banner: Value,
  pub hot_rank: Value,
  pub user_menu: Vec<Value>,
  pub recommend_list: Vec<Value>,
  pub user_collected_menu: Vec<Value>,
  pub all_rank: Vec<Value>,
}
