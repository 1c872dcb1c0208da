// User, user-group and role endpoints
//
// Users live under the original `/api/users` routes; groups and roles
// under `/api/v1/users` and answer with the `{Code, Message, Response}`
// envelope.

use tracing::debug;

use crate::error::Error;
use crate::rest::client::RestClient;
use crate::types::{
    CreateUserGroupRequest, Envelope, UserGroupResponse, UserRequest, UserResponse,
    UserRoleResponse,
};

impl RestClient {
    // ── Users ────────────────────────────────────────────────────────

    /// `GET /api/users`
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, Error> {
        let users: Option<Vec<UserResponse>> = self.get(&["api", "users"]).await?;
        Ok(users.unwrap_or_default())
    }

    /// `GET /api/users/{username}`
    pub async fn get_user(&self, username: &str) -> Result<UserResponse, Error> {
        self.get(&["api", "users", username]).await
    }

    /// `POST /api/users/{username}`
    pub async fn create_user(&self, request: &UserRequest) -> Result<UserResponse, Error> {
        debug!(username = %request.username, "creating user");
        self.post(&["api", "users", &request.username], request)
            .await
    }

    /// `PUT /api/users/{username}`
    pub async fn update_user(&self, request: &UserRequest) -> Result<UserResponse, Error> {
        debug!(username = %request.username, "updating user");
        self.put(&["api", "users", &request.username], request)
            .await
    }

    /// `DELETE /api/users/{username}`
    pub async fn delete_user(&self, username: &str) -> Result<(), Error> {
        debug!(username, "deleting user");
        self.delete(&["api", "users", username]).await
    }

    // ── Groups ───────────────────────────────────────────────────────

    /// `GET /api/v1/users/groups`
    pub async fn list_user_groups(&self) -> Result<Vec<UserGroupResponse>, Error> {
        let env: Envelope<Option<Vec<UserGroupResponse>>> =
            self.get(&["api", "v1", "users", "groups"]).await?;
        Ok(Self::unwrap_envelope(env).unwrap_or_default())
    }

    /// `POST /api/v1/users/group`
    pub async fn create_user_group(
        &self,
        request: &CreateUserGroupRequest,
    ) -> Result<UserGroupResponse, Error> {
        debug!(group = %request.user_group.id, "creating user group");
        let env: Envelope<UserGroupResponse> =
            self.post(&["api", "v1", "users", "group"], request).await?;
        Ok(Self::unwrap_envelope(env))
    }

    /// `PUT /api/v1/users/group`
    pub async fn update_user_group(
        &self,
        group: &UserGroupResponse,
    ) -> Result<UserGroupResponse, Error> {
        debug!(group = %group.id, "updating user group");
        let env: Envelope<UserGroupResponse> =
            self.put(&["api", "v1", "users", "group"], group).await?;
        Ok(Self::unwrap_envelope(env))
    }

    /// `DELETE /api/v1/users/group?group_id={id}`
    pub async fn delete_user_group(&self, group_id: &str) -> Result<(), Error> {
        debug!(group_id, "deleting user group");
        self.delete_with_params(&["api", "v1", "users", "group"], &[("group_id", group_id)])
            .await
    }

    // ── Roles ────────────────────────────────────────────────────────

    /// `GET /api/v1/users/roles?platform={bool}`
    ///
    /// `platform = true` lists platform-wide roles, `false` network roles.
    pub async fn list_user_roles(&self, platform: bool) -> Result<Vec<UserRoleResponse>, Error> {
        let flag = if platform { "true" } else { "false" };
        let env: Envelope<Option<Vec<UserRoleResponse>>> = self
            .get_with_params(&["api", "v1", "users", "roles"], &[("platform", flag)])
            .await?;
        Ok(Self::unwrap_envelope(env).unwrap_or_default())
    }
}
