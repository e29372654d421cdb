use async_trait::async_trait;
use uuid::Uuid;

use super::{aborted, Engine};
use crate::{
    api::{NewPlace, PlaceAPI},
    db::{DocumentStore, Filter, StoreTransaction},
    entities::{Place, User},
    error::{not_found_error, store_error, Error, Resource},
    external::Geocoder,
};

#[async_trait]
impl<S, G> PlaceAPI for Engine<S, G>
where
    S: DocumentStore,
    G: Geocoder,
{
    #[tracing::instrument(skip(self))]
    async fn list_places(&self) -> Result<Vec<Place>, Error> {
        self.store.find(Filter::All).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_place(&self, id: Uuid) -> Result<Place, Error> {
        self.store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| not_found_error(Resource::Place))
    }

    #[tracing::instrument(skip(self))]
    async fn list_places_by_user(&self, user_id: Uuid) -> Result<Vec<Place>, Error> {
        let user: User = self
            .store
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| not_found_error(Resource::Place))?;

        let places: Vec<Place> = self.store.find_by_ids(&user.places).await?;

        if places.is_empty() {
            return Err(not_found_error(Resource::Place));
        }

        Ok(places)
    }

    #[tracing::instrument(skip(self))]
    async fn create_place(&self, params: NewPlace) -> Result<Place, Error> {
        // geocode first: nothing has been written if this fails
        let location = self.geocoder.resolve(&params.address).await?;

        let creator: User = self
            .store
            .find_by_id(&params.creator)
            .await?
            .ok_or_else(|| not_found_error(Resource::Creator))?;

        let place = Place::new(
            params.title,
            params.description,
            params.address,
            location,
            creator.id,
        );
        let creator_id = creator.id;

        let place = self
            .store
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let mut creator: User = tx
                        .find_by_id_for_update(&creator_id)
                        .await?
                        .ok_or_else(|| store_error("creator disappeared while adding a place"))?;

                    tx.insert(&place).await?;
                    creator.add_place(place.id);
                    tx.update(&creator).await?;

                    Ok::<_, Error>(place)
                })
            })
            .await
            .map_err(aborted)?;

        tracing::info!(place_id = %place.id, creator = %creator_id, "place created");

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn update_place(
        &self,
        id: Uuid,
        title: String,
        description: String,
    ) -> Result<Place, Error> {
        let mut place: Place = self
            .store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| not_found_error(Resource::Place))?;

        place.revise(title, description);

        self.store.update(&place).await?;

        Ok(place)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_place(&self, id: Uuid) -> Result<(), Error> {
        let place: Place = self
            .store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| not_found_error(Resource::Place))?;

        let creator: User = match self.store.find_by_id(&place.creator).await? {
            Some(creator) => creator,
            None => {
                tracing::warn!(creator = %place.creator, "place references a missing creator");
                return Err(not_found_error(Resource::Creator));
            }
        };

        let (place_id, creator_id) = (place.id, creator.id);

        self.store
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let mut creator: User = tx
                        .find_by_id_for_update(&creator_id)
                        .await?
                        .ok_or_else(|| store_error("creator disappeared while removing a place"))?;

                    tx.remove::<Place>(&place_id).await?;

                    if !creator.remove_place(&place_id) {
                        tracing::warn!(place_id = %place_id, "place was not listed by its creator");
                    }
                    tx.update(&creator).await?;

                    Ok::<_, Error>(())
                })
            })
            .await
            .map_err(aborted)?;

        tracing::info!(place_id = %place_id, creator = %creator_id, "place deleted");

        Ok(())
    }
}
