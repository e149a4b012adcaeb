pub mod account;
pub mod health;
pub mod rbac;
pub mod session;

use crate::db::Account;
use crate::server::GatehouseServer;
use serde::Serialize;

/// An account as replied over the wire: profile attached, password hash
/// stripped by the model's serializer, role names joined into one field.
#[derive(Debug, Serialize)]
pub struct AccountReply {
    #[serde(flatten)]
    pub account: Account,
    pub roles: String,
}

/// Attach the account's current role names from the policy graph.
pub fn account_with_roles(server: &GatehouseServer, account: Account) -> AccountReply {
    let roles = server.roles.get_role_for_user(&account.user.id).join(",");
    AccountReply { account, roles }
}
