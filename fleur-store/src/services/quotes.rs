//! Quote service: bespoke-work requests and their lifecycle
//!
//! Acceptance checks the proposal's validity window: accepting an
//! expired proposal persists the `Expired` transition and reports
//! `QuoteExpired`, so the stored status always reflects reality.

use super::require_admin;
use crate::store::KeyedStore;
use shared::models::{Actor, Quote, QuoteProposal, QuoteRequest, QuoteStatus, QuoteStatusEntry};
use shared::util::{now_millis, record_id};
use shared::{AppError, AppResult, ErrorCode};

#[derive(Clone)]
pub struct QuoteService {
    store: KeyedStore,
}

impl QuoteService {
    pub fn new(store: KeyedStore) -> Self {
        Self { store }
    }

    /// Customer: file a new quote request.
    pub async fn request(&self, actor: &Actor, payload: QuoteRequest) -> AppResult<Quote> {
        if payload.details.trim().is_empty() {
            return Err(AppError::validation("quote details must not be empty"));
        }
        let now = now_millis();
        let quote = Quote {
            id: record_id(),
            user_id: actor.id.clone(),
            quote_type: payload.quote_type,
            details: payload.details,
            status: QuoteStatus::Pending,
            proposal: None,
            status_history: vec![QuoteStatusEntry::new(QuoteStatus::Pending, actor, None)],
            created_at: now,
            updated_at: now,
        };
        self.store.put(&quote).await?;
        tracing::info!(quote_id = %quote.id, quote_type = ?quote.quote_type, "quote requested");
        Ok(quote)
    }

    /// Admin: Pending → InProgress.
    pub async fn start_progress(&self, actor: &Actor, quote_id: &str) -> AppResult<Quote> {
        require_admin(actor)?;
        let mut quote = self.load(quote_id).await?;
        self.apply(&mut quote, QuoteStatus::InProgress, actor, None)
            .await?;
        Ok(quote)
    }

    /// Admin: attach a priced proposal and send it to the customer.
    pub async fn send_proposal(
        &self,
        actor: &Actor,
        quote_id: &str,
        proposal: QuoteProposal,
    ) -> AppResult<Quote> {
        require_admin(actor)?;
        if proposal.amount <= rust_decimal::Decimal::ZERO {
            return Err(AppError::validation("proposal amount must be positive"));
        }
        if proposal.valid_until <= now_millis() {
            return Err(AppError::validation("proposal validity must be in the future"));
        }
        let mut quote = self.load(quote_id).await?;
        require_transition(&quote, QuoteStatus::Sent)?;
        quote.proposal = Some(proposal);
        self.apply(&mut quote, QuoteStatus::Sent, actor, None).await?;
        Ok(quote)
    }

    /// Owner only: accept the sent proposal.
    ///
    /// If the proposal's validity window has passed, the quote is
    /// transitioned to `Expired` instead and `QuoteExpired` is
    /// returned.
    pub async fn accept(&self, actor: &Actor, quote_id: &str) -> AppResult<Quote> {
        let mut quote = self.owned(actor, quote_id).await?;
        require_transition(&quote, QuoteStatus::Accepted)?;
        let proposal = quote
            .proposal
            .clone()
            .ok_or_else(|| AppError::new(ErrorCode::ProposalMissing).with_detail("id", quote_id))?;

        if proposal.valid_until < now_millis() {
            self.apply(
                &mut quote,
                QuoteStatus::Expired,
                actor,
                Some("Proposal validity window passed".to_string()),
            )
            .await?;
            return Err(AppError::new(ErrorCode::QuoteExpired)
                .with_detail("id", quote_id)
                .with_detail("valid_until", proposal.valid_until));
        }

        self.apply(&mut quote, QuoteStatus::Accepted, actor, None)
            .await?;
        Ok(quote)
    }

    /// Owner only: decline the sent proposal.
    pub async fn decline(
        &self,
        actor: &Actor,
        quote_id: &str,
        note: Option<String>,
    ) -> AppResult<Quote> {
        let mut quote = self.owned(actor, quote_id).await?;
        self.apply(&mut quote, QuoteStatus::Declined, actor, note)
            .await?;
        Ok(quote)
    }

    /// Admin: mark an accepted quote completed (converted to an order).
    pub async fn complete(&self, actor: &Actor, quote_id: &str) -> AppResult<Quote> {
        require_admin(actor)?;
        let mut quote = self.load(quote_id).await?;
        self.apply(&mut quote, QuoteStatus::Completed, actor, None)
            .await?;
        Ok(quote)
    }

    /// Fetch a quote the actor may see (owner or admin).
    pub async fn get(&self, actor: &Actor, quote_id: &str) -> AppResult<Quote> {
        let quote = self.load(quote_id).await?;
        let owner = shared::models::OwnerRef::User(quote.user_id.clone());
        if !actor.can_access(&owner) {
            return Err(AppError::permission_denied("not the owner of this quote"));
        }
        Ok(quote)
    }

    /// Quotes of one user, newest first.
    pub async fn quotes_for(&self, actor: &Actor, user_id: &str) -> AppResult<Vec<Quote>> {
        if !actor.is_admin() && actor.id != user_id {
            return Err(AppError::permission_denied("cannot list another user's quotes"));
        }
        let mut quotes: Vec<Quote> = self.store.get_by_index("user_id", user_id).await?;
        quotes.sort_by_key(|q| std::cmp::Reverse(q.created_at));
        Ok(quotes)
    }

    /// Admin: all quotes, newest first.
    pub async fn all_quotes(&self, actor: &Actor) -> AppResult<Vec<Quote>> {
        require_admin(actor)?;
        let mut quotes: Vec<Quote> = self.store.get_all().await?;
        quotes.sort_by_key(|q| std::cmp::Reverse(q.created_at));
        Ok(quotes)
    }

    async fn load(&self, quote_id: &str) -> AppResult<Quote> {
        self.store
            .get::<Quote>(quote_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::QuoteNotFound).with_detail("id", quote_id))
    }

    /// Load with strict owner check: accept/decline are customer
    /// decisions, admins included only when acting on their own quote.
    async fn owned(&self, actor: &Actor, quote_id: &str) -> AppResult<Quote> {
        let quote = self.load(quote_id).await?;
        if quote.user_id != actor.id {
            return Err(AppError::permission_denied(
                "only the quote's owner may decide on a proposal",
            ));
        }
        Ok(quote)
    }

    async fn apply(
        &self,
        quote: &mut Quote,
        next: QuoteStatus,
        actor: &Actor,
        note: Option<String>,
    ) -> AppResult<()> {
        require_transition(quote, next)?;
        quote.status = next;
        quote
            .status_history
            .push(QuoteStatusEntry::new(next, actor, note));
        quote.updated_at = now_millis();
        self.store.update(quote).await?;
        tracing::info!(quote_id = %quote.id, status = next.as_str(), "quote transitioned");
        Ok(())
    }
}

fn require_transition(quote: &Quote, next: QuoteStatus) -> AppResult<()> {
    if !quote.status.can_transition_to(next) {
        return Err(AppError::invalid_transition(
            quote.status.as_str(),
            next.as_str(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{ProposalLine, QuoteType, Role};

    fn proposal(valid_until: i64) -> QuoteProposal {
        QuoteProposal {
            amount: Decimal::new(25000, 2),
            lines: vec![ProposalLine {
                description: "Table arrangements".to_string(),
                amount: Decimal::new(25000, 2),
            }],
            valid_until,
            note: None,
        }
    }

    async fn setup() -> (QuoteService, Actor, Actor) {
        let store = KeyedStore::open_in_memory().unwrap();
        (
            QuoteService::new(store),
            Actor::new("a1", "Boss", Role::Admin),
            Actor::new("u1", "Ana", Role::Customer),
        )
    }

    async fn sent_quote(
        quotes: &QuoteService,
        admin: &Actor,
        customer: &Actor,
        valid_until: i64,
    ) -> Quote {
        let quote = quotes
            .request(
                customer,
                QuoteRequest {
                    quote_type: QuoteType::Wedding,
                    details: "200 guests, peonies".to_string(),
                },
            )
            .await
            .unwrap();
        quotes.start_progress(admin, &quote.id).await.unwrap();
        quotes
            .send_proposal(admin, &quote.id, proposal(valid_until))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (quotes, admin, customer) = setup().await;
        let quote = sent_quote(&quotes, &admin, &customer, now_millis() + 86_400_000).await;
        assert_eq!(quote.status, QuoteStatus::Sent);
        assert!(quote.proposal.is_some());

        let accepted = quotes.accept(&customer, &quote.id).await.unwrap();
        assert_eq!(accepted.status, QuoteStatus::Accepted);

        let completed = quotes.complete(&admin, &quote.id).await.unwrap();
        assert_eq!(completed.status, QuoteStatus::Completed);
        assert_eq!(completed.status_history.len(), 5);
    }

    #[tokio::test]
    async fn test_accept_expired_redirects_to_expired() {
        let (quotes, admin, customer) = setup().await;
        let quote = sent_quote(&quotes, &admin, &customer, now_millis() + 50).await;

        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        let err = quotes.accept(&customer, &quote.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuoteExpired);

        let stored = quotes.get(&admin, &quote.id).await.unwrap();
        assert_eq!(stored.status, QuoteStatus::Expired);

        // Expired is terminal; a retry is a transition error now.
        let err = quotes.accept(&customer, &quote.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[tokio::test]
    async fn test_only_owner_accepts() {
        let (quotes, admin, customer) = setup().await;
        let quote = sent_quote(&quotes, &admin, &customer, now_millis() + 86_400_000).await;

        let err = quotes.accept(&admin, &quote.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let stranger = Actor::new("u2", "Eve", Role::Customer);
        let err = quotes.accept(&stranger, &quote.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_no_proposal_before_progress() {
        let (quotes, admin, customer) = setup().await;
        let quote = quotes
            .request(
                &customer,
                QuoteRequest {
                    quote_type: QuoteType::Event,
                    details: "Office party".to_string(),
                },
            )
            .await
            .unwrap();

        let err = quotes
            .send_proposal(&admin, &quote.id, proposal(now_millis() + 1000))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[tokio::test]
    async fn test_decline_is_terminal() {
        let (quotes, admin, customer) = setup().await;
        let quote = sent_quote(&quotes, &admin, &customer, now_millis() + 86_400_000).await;

        quotes
            .decline(&customer, &quote.id, Some("over budget".to_string()))
            .await
            .unwrap();
        let err = quotes.accept(&customer, &quote.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatusTransition);
    }

    #[tokio::test]
    async fn test_empty_details_rejected() {
        let (quotes, _, customer) = setup().await;
        let err = quotes
            .request(
                &customer,
                QuoteRequest {
                    quote_type: QuoteType::Custom,
                    details: "   ".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }
}
