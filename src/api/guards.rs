//! Identity guards. Authentication itself happens upstream: a trusted
//! middleware resolves the caller and forwards identity in headers. These
//! guards only read those headers; a missing identity is a 401.

use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};

use crate::store::BuyerSnapshot;

/// Buyer identity forwarded by the auth middleware.
#[derive(Debug, Clone)]
pub struct BuyerIdentity(pub BuyerSnapshot);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BuyerIdentity {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();
        let (Some(id), Some(email), Some(name)) = (
            headers.get_one("x-buyer-id"),
            headers.get_one("x-buyer-email"),
            headers.get_one("x-buyer-name"),
        ) else {
            return Outcome::Error((Status::Unauthorized, ()));
        };

        Outcome::Success(Self(BuyerSnapshot {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            avatar: headers.get_one("x-buyer-avatar").map(ToString::to_string),
        }))
    }
}

/// Shop-operator identity; scopes every read to this shop's line items.
#[derive(Debug, Clone)]
pub struct ShopOperator {
    pub shop_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ShopOperator {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.headers().get_one("x-shop-id") {
            Some(shop_id) if !shop_id.trim().is_empty() => Outcome::Success(Self {
                shop_id: shop_id.to_string(),
            }),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

/// Administrative access for tenant-unrestricted reads.
#[derive(Debug, Clone, Copy)]
pub struct AdminIdentity;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminIdentity {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match request.headers().get_one("x-admin") {
            Some("true") => Outcome::Success(Self),
            _ => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
