use async_trait::async_trait;

use super::Engine;
use crate::{
    api::{NewUser, UserAPI},
    db::{DocumentStore, Filter},
    entities::{User, UserView},
    error::{auth_error, conflict_error, Error},
    external::Geocoder,
};

#[async_trait]
impl<S, G> UserAPI for Engine<S, G>
where
    S: DocumentStore,
    G: Geocoder,
{
    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserView>, Error> {
        let users: Vec<User> = self.store.find(Filter::All).await?;

        Ok(users.into_iter().map(UserView::from).collect())
    }

    #[tracing::instrument(skip(self, params), fields(email = %params.email))]
    async fn signup(&self, params: NewUser) -> Result<UserView, Error> {
        let existing: Option<User> = self
            .store
            .find_one(Filter::eq("email", params.email.as_str()))
            .await?;

        if existing.is_some() {
            tracing::info!("email already registered");
            return Err(conflict_error());
        }

        let user = User::new(params.name, params.email, params.password);

        // the store's unique email index settles signups racing past the check above
        self.store.insert(&user).await?;

        tracing::info!(user_id = %user.id, "user signed up");

        Ok(user.into())
    }

    #[tracing::instrument(skip(self, password))]
    async fn login(&self, email: String, password: String) -> Result<UserView, Error> {
        let existing: Option<User> = self.store.find_one(Filter::eq("email", email)).await?;

        match existing {
            Some(user) if user.password_matches(&password) => Ok(user.into()),
            _ => {
                tracing::info!("login rejected");
                Err(auth_error())
            }
        }
    }
}
