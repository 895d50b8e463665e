//! HTTP client for the spreadsheet-backed remote store.
//!
//! The store is a single web-app endpoint: `POST` replaces the user's
//! snapshot, `GET ?action=READ_STOCKS` looks up a live quote. Both the
//! async and blocking variants are generated from one definition behind
//! feature flags.

/// Content type the store expects on pushes. Plain text avoids a CORS
/// preflight on the hosting platform; the body is still JSON.
const PUSH_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Query action for quote lookups.
const QUOTE_ACTION: &str = "READ_STOCKS";

/// Generates a remote store client (async or blocking) with builder,
/// methods, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        http_type: $http_type:ty,
        response_type: $resp_type:ty,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// PIN identifying the user's sheet.
            user_id: Option<SecretString>,
            /// Web-app endpoint.
            base_url: Option<String>,
        }

        impl $builder {
            /// Sets the user id (the plaintext PIN).
            #[inline]
            #[must_use]
            pub fn user_id<T: Into<String>>(mut self, user_id: T) -> Self {
                self.user_id = Some(SecretString::from(user_id.into()));
                self
            }

            /// Sets the web-app endpoint.
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`WealthError::MissingCredential`] if the user id or
            /// endpoint was not provided, [`WealthError::InvalidInput`] if
            /// the endpoint is not a URL, and [`WealthError::Http`] if the
            /// HTTP client fails to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let user_id = self
                    .user_id
                    .filter(|id| !id.expose_secret().trim().is_empty())
                    .ok_or(WealthError::MissingCredential("user id"))?;
                let raw_url = self
                    .base_url
                    .ok_or(WealthError::MissingCredential("sync url"))?;
                let base_url = Url::parse(raw_url.trim()).map_err(|err| {
                    WealthError::InvalidInput(format!("sync url `{raw_url}`: {err}"))
                })?;
                tracing::debug!(base_url = %base_url, "building sheet client");
                let http = <$http_type>::builder().build()?;

                Ok($client {
                    http,
                    user_id,
                    base_url,
                })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client.
            http: $http_type,
            /// PIN identifying the user's sheet.
            user_id: SecretString,
            /// Web-app endpoint.
            base_url: Url,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder {
                    user_id: None,
                    base_url: None,
                }
            }

            /// Pushes the flattened holdings and net worth of `state`.
            ///
            /// The whole snapshot is sent; the store replaces what it had.
            ///
            /// # Errors
            ///
            /// Returns an error if the request fails, the store answers
            /// with a non-success HTTP status, or the reply's `status` is
            /// not `"success"`.
            #[inline]
            #[tracing::instrument(skip_all, fields(accounts = state.accounts.len(), deposits = state.fixed_deposits.len()))]
            pub $($async_kw)? fn push(
                &self,
                state: &AppState,
                policy: NetWorthPolicy,
            ) -> Result<SyncReply> {
                let payload = build_payload(self.user_id.expose_secret(), state, policy);
                let body = serde_json::to_string(&payload)?;
                tracing::debug!(total = payload.total, assets = payload.assets.len(), "pushing snapshot");
                let response: $resp_type = self
                    .http
                    .post(self.base_url.clone())
                    .header(CONTENT_TYPE, PUSH_CONTENT_TYPE)
                    .body(body)
                    .send()
                    $( .$await_ext )?
                    ?;
                let reply: SyncReply = Self::read_json(response) $( .$await_ext )? ?;
                if reply.is_success() {
                    Ok(reply)
                } else {
                    let message = reply
                        .msg
                        .unwrap_or_else(|| format!("store replied `{}`", reply.status));
                    tracing::debug!(message = %message, "push rejected");
                    Err(WealthError::Api {
                        status: 200,
                        message,
                    })
                }
            }

            /// Looks up the live price and dividend yield for `symbol`.
            ///
            /// Missing or non-numeric fields in the reply come back as 0.
            ///
            /// # Errors
            ///
            /// Returns an error if the request fails, the store answers
            /// with a non-success HTTP status, or the reply is not JSON.
            #[inline]
            #[tracing::instrument(skip_all, fields(symbol = %symbol))]
            pub $($async_kw)? fn quote(&self, symbol: &str) -> Result<Quote> {
                let normalized = symbol.trim().to_uppercase();
                let url = Url::parse_with_params(
                    self.base_url.as_str(),
                    [
                        ("action", QUOTE_ACTION),
                        ("userId", self.user_id.expose_secret()),
                        ("symbol", normalized.as_str()),
                    ],
                )
                .map_err(|err| WealthError::InvalidInput(format!("quote url: {err}")))?;
                tracing::trace!("requesting quote");
                let response: $resp_type = self.http.get(url).send() $( .$await_ext )? ?;
                Self::read_json(response) $( .$await_ext )?
            }

            /// Checks the status and deserializes a JSON body.
            $($async_kw)? fn read_json<T: serde::de::DeserializeOwned>(
                response: $resp_type,
            ) -> Result<T> {
                let status = response.status();
                tracing::debug!(status = %status, "received response");
                if status.is_success() {
                    let body = response.text() $( .$await_ext )? ?;
                    tracing::trace!(body_len = body.len(), "parsing response body");
                    serde_json::from_str(&body).map_err(WealthError::from)
                } else {
                    let message = response
                        .text()
                        $( .$await_ext )?
                        .unwrap_or_else(|_| "unknown error".to_owned());
                    tracing::debug!(status = status.as_u16(), message = %message, "store error");
                    Err(WealthError::Api {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
        }

    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async HTTP client for the remote store.

    use reqwest::header::CONTENT_TYPE;
    use secrecy::{ExposeSecret as _, SecretString};
    use url::Url;

    use super::{PUSH_CONTENT_TYPE, QUOTE_ACTION};
    use crate::aggregator::NetWorthPolicy;
    use crate::error::{Result, WealthError};
    use crate::models::{AppState, Quote, SyncReply};
    use crate::sync::build_payload;

    define_client! {
        client_name: SheetClient,
        builder_name: SheetClientBuilder,
        http_type: reqwest::Client,
        response_type: reqwest::Response,
        client_doc: "Async client for the remote store.\n\nUse [`SheetClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SheetClient`].",
        async_kw: async,
        await_kw: await,
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) HTTP client for the remote store.

    use reqwest::header::CONTENT_TYPE;
    use secrecy::{ExposeSecret as _, SecretString};
    use url::Url;

    use super::{PUSH_CONTENT_TYPE, QUOTE_ACTION};
    use crate::aggregator::NetWorthPolicy;
    use crate::error::{Result, WealthError};
    use crate::models::{AppState, Quote, SyncReply};
    use crate::sync::build_payload;

    define_client! {
        client_name: SheetBlockingClient,
        builder_name: SheetBlockingClientBuilder,
        http_type: reqwest::blocking::Client,
        response_type: reqwest::blocking::Response,
        client_doc: "Blocking (synchronous) client for the remote store.\n\nUse [`SheetBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`SheetBlockingClient`].",
    }
}

#[cfg(feature = "async")]
pub use async_client::{SheetClient, SheetClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{SheetBlockingClient, SheetBlockingClientBuilder};
