//! Mock subscription billing. Nothing is charged; validated input produces a
//! subscription and a paid invoice, both kept in an in-memory ledger.

use std::sync::LazyLock;

use chrono::{DateTime, Months, Utc};
use regex::Regex;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AcademyError, AcademyResult};
use crate::models::{
    Cancellation, Interval, Invoice, InvoicePdf, PaymentDetails, PaymentMethod, Plan, PlanChange,
    Subscription, SubscriptionReceipt, SubscriptionStatus,
};
use crate::store::Latency;

static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}$").expect("valid regex"));
static CVV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3,4}$").expect("valid regex"));

const INVOICE_BASE_URL: &str = "https://apocalypseacademy.com/invoices";

fn is_card(method: &str) -> bool {
    matches!(method, "credit-card" | "debit-card")
}

/// 11 digits once punctuation is stripped, not all the same digit. This is a
/// shape check only, not the CPF checksum.
pub fn is_valid_document(doc: &str) -> bool {
    let digits: Vec<char> = doc.chars().filter(char::is_ascii_digit).collect();
    digits.len() == 11 && digits.iter().any(|d| *d != digits[0])
}

pub fn end_date(start: DateTime<Utc>, interval: Interval) -> Option<DateTime<Utc>> {
    let months = match interval {
        Interval::Month => 1,
        Interval::Year => 12,
    };
    start.checked_add_months(Months::new(months))
}

#[allow(clippy::too_many_arguments)]
fn plan(
    id: &str,
    name: &str,
    price_cents: u64,
    regular_price_cents: Option<u64>,
    interval: Interval,
    features: &[&str],
    limitations: &[&str],
    most_popular: bool,
) -> Plan {
    Plan {
        id: id.into(),
        name: name.into(),
        price_cents,
        regular_price_cents,
        interval,
        features: features.iter().map(|s| s.to_string()).collect(),
        limitations: limitations.iter().map(|s| s.to_string()).collect(),
        most_popular,
    }
}

pub fn default_plans() -> Vec<Plan> {
    let basic_limits = [
        "Sem acesso a conteúdo premium",
        "Sem acesso a devocionais em áudio",
        "Sem downloads de materiais",
    ];
    let standard_limits = ["Sem acesso a cursos premium", "Sem acesso a eventos exclusivos"];
    vec![
        plan(
            "basic",
            "Plano Básico",
            2990,
            None,
            Interval::Month,
            &[
                "Acesso a documentários selecionados",
                "Acesso a cursos básicos",
                "Revistas digitais mensais",
                "Comunidade no Telegram",
            ],
            &basic_limits,
            false,
        ),
        plan(
            "standard",
            "Plano Padrão",
            4990,
            None,
            Interval::Month,
            &[
                "Acesso a todos os documentários",
                "Acesso a todos os cursos (exceto premium)",
                "Revistas digitais mensais",
                "Devocionais em áudio",
                "Comunidade no Telegram e WhatsApp",
                "Download de materiais de estudo",
            ],
            &standard_limits,
            true,
        ),
        plan(
            "premium",
            "Plano Premium",
            7990,
            None,
            Interval::Month,
            &[
                "Acesso completo a todo o conteúdo",
                "Cursos premium e exclusivos",
                "Documentários em 4K/6K",
                "Revistas digitais mensais",
                "Devocionais em áudio",
                "Comunidade VIP no Telegram e WhatsApp",
                "Download de todos os materiais",
                "Acesso a eventos exclusivos",
                "Mentoria mensal em grupo",
            ],
            &[],
            false,
        ),
        plan(
            "annual-basic",
            "Plano Básico Anual",
            29900,
            Some(35880),
            Interval::Year,
            &["Todos os benefícios do Plano Básico", "Economia de 17% em relação ao plano mensal"],
            &basic_limits,
            false,
        ),
        plan(
            "annual-standard",
            "Plano Padrão Anual",
            49900,
            Some(59880),
            Interval::Year,
            &["Todos os benefícios do Plano Padrão", "Economia de 17% em relação ao plano mensal"],
            &standard_limits,
            true,
        ),
        plan(
            "annual-premium",
            "Plano Premium Anual",
            79900,
            Some(95880),
            Interval::Year,
            &[
                "Todos os benefícios do Plano Premium",
                "Economia de 17% em relação ao plano mensal",
                "Bônus: E-book exclusivo \"Estratégias de Sobrevivência nos Últimos Dias\"",
            ],
            &[],
            false,
        ),
    ]
}

pub fn default_payment_methods() -> Vec<PaymentMethod> {
    [
        ("credit-card", "Cartão de Crédito"),
        ("debit-card", "Cartão de Débito"),
        ("pix", "PIX"),
        ("boleto", "Boleto Bancário"),
        ("paypal", "PayPal"),
    ]
    .into_iter()
    .map(|(id, name)| PaymentMethod { id: id.into(), name: name.into(), enabled: true })
    .collect()
}

#[derive(Default)]
struct Ledger {
    subscriptions: Vec<Subscription>,
    invoices: Vec<Invoice>,
}

pub struct BillingService {
    plans: Vec<Plan>,
    methods: Vec<PaymentMethod>,
    ledger: RwLock<Ledger>,
    latency: Latency,
}

impl BillingService {
    pub fn new(plans: Vec<Plan>, methods: Vec<PaymentMethod>, latency: Latency) -> Self {
        Self { plans, methods, ledger: RwLock::new(Ledger::default()), latency }
    }

    pub fn with_defaults(latency: Latency) -> Self {
        Self::new(default_plans(), default_payment_methods(), latency)
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn plan(&self, plan_id: &str) -> AcademyResult<&Plan> {
        self.plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| AcademyError::not_found("plan", plan_id))
    }

    pub fn payment_methods(&self) -> Vec<PaymentMethod> {
        self.methods.iter().filter(|m| m.enabled).cloned().collect()
    }

    pub fn validate_payment_details(&self, details: &PaymentDetails) -> AcademyResult<()> {
        let method = details.method.as_str();
        if !self.methods.iter().any(|m| m.id == method && m.enabled) {
            return Err(AcademyError::validation(format!(
                "invalid or disabled payment method: {method}"
            )));
        }

        if is_card(method) {
            let number = details.card_number.as_deref().unwrap_or_default();
            if !(13..=19).contains(&number.chars().count()) {
                return Err(AcademyError::validation("invalid card number"));
            }
            if !details.card_expiry.as_deref().is_some_and(|e| EXPIRY_RE.is_match(e)) {
                return Err(AcademyError::validation(
                    "invalid card expiry date (MM/YY format required)",
                ));
            }
            if !details.card_cvv.as_deref().is_some_and(|c| CVV_RE.is_match(c)) {
                return Err(AcademyError::validation("invalid CVV code"));
            }
            if details.card_holder.as_deref().map_or(0, |h| h.trim().chars().count()) < 3 {
                return Err(AcademyError::validation("invalid card holder name"));
            }
        }

        if matches!(method, "pix" | "boleto")
            && !details.document_number.as_deref().is_some_and(is_valid_document)
        {
            return Err(AcademyError::validation("invalid CPF number"));
        }

        Ok(())
    }

    pub async fn process_subscription(
        &self,
        user_id: &str,
        plan_id: &str,
        details: &PaymentDetails,
    ) -> AcademyResult<SubscriptionReceipt> {
        self.latency.simulate().await;
        let plan = self.plan(plan_id)?;
        if let Err(e) = self.validate_payment_details(details) {
            tracing::warn!(user_id, plan_id, error = %e, "payment details rejected");
            return Err(e);
        }

        let now = Utc::now();
        let end = end_date(now, plan.interval)
            .ok_or_else(|| AcademyError::Internal("subscription end date out of range".into()))?;
        let last_four = details
            .card_number
            .as_deref()
            .filter(|_| is_card(&details.method))
            .map(|n| {
                let chars: Vec<char> = n.chars().collect();
                chars[chars.len().saturating_sub(4)..].iter().collect::<String>()
            });

        let subscription = Subscription {
            id: format!("sub_{}", Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            price_cents: plan.price_cents,
            interval: plan.interval,
            status: SubscriptionStatus::Active,
            start_date: now,
            end_date: end,
            payment_method: details.method.clone(),
            last_four,
            auto_renew: true,
            created_at: now,
            cancelled_at: None,
            cancellation_reason: None,
        };
        let period = match plan.interval {
            Interval::Month => "Mensal",
            Interval::Year => "Anual",
        };
        let invoice = Invoice {
            id: format!("inv_{}", Uuid::new_v4().simple()),
            subscription_id: subscription.id.clone(),
            user_id: user_id.to_string(),
            amount_cents: plan.price_cents,
            status: "paid".into(),
            payment_method: details.method.clone(),
            description: format!("Assinatura {} - {}", plan.name, period),
            paid_at: now,
            created_at: now,
        };

        let mut ledger = self.ledger.write().await;
        ledger.subscriptions.push(subscription.clone());
        ledger.invoices.push(invoice.clone());
        tracing::info!(user_id, plan_id, subscription_id = %subscription.id, "subscription created");

        Ok(SubscriptionReceipt {
            subscription,
            invoice,
            message: "Assinatura processada com sucesso!".into(),
        })
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
        reason: Option<String>,
    ) -> AcademyResult<Cancellation> {
        self.latency.simulate().await;
        let mut ledger = self.ledger.write().await;
        let sub = ledger
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .ok_or_else(|| AcademyError::not_found("subscription", subscription_id))?;

        let now = Utc::now();
        sub.status = SubscriptionStatus::Cancelled;
        sub.auto_renew = false;
        sub.cancelled_at = Some(now);
        sub.cancellation_reason = reason.clone();
        tracing::info!(subscription_id, "subscription cancelled");

        Ok(Cancellation {
            subscription_id: subscription_id.to_string(),
            message: "Assinatura cancelada com sucesso".into(),
            cancellation_date: now,
            reason,
        })
    }

    pub async fn update_subscription(
        &self,
        subscription_id: &str,
        new_plan_id: &str,
    ) -> AcademyResult<PlanChange> {
        self.latency.simulate().await;
        let plan = self.plan(new_plan_id)?;
        let mut ledger = self.ledger.write().await;
        let sub = ledger
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .ok_or_else(|| AcademyError::not_found("subscription", subscription_id))?;

        sub.plan_id = plan.id.clone();
        sub.plan_name = plan.name.clone();
        sub.price_cents = plan.price_cents;
        sub.interval = plan.interval;
        let now = Utc::now();
        tracing::info!(subscription_id, plan_id = %plan.id, "subscription plan changed");

        Ok(PlanChange {
            subscription_id: subscription_id.to_string(),
            message: "Assinatura atualizada com sucesso".into(),
            updated_at: now,
            new_plan_id: plan.id.clone(),
            new_plan_name: plan.name.clone(),
            price_cents: plan.price_cents,
            interval: plan.interval,
            effective_date: now,
        })
    }

    /// Most recent active subscription for the user.
    pub async fn user_subscription(&self, user_id: &str) -> AcademyResult<Subscription> {
        self.latency.simulate().await;
        let ledger = self.ledger.read().await;
        ledger
            .subscriptions
            .iter()
            .rev()
            .find(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .cloned()
            .ok_or_else(|| AcademyError::not_found("subscription", format!("user {user_id}")))
    }

    /// Invoices for the user, newest first.
    pub async fn payment_history(&self, user_id: &str) -> Vec<Invoice> {
        self.latency.simulate().await;
        let ledger = self.ledger.read().await;
        ledger
            .invoices
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn invoice_pdf(&self, invoice_id: &str) -> AcademyResult<InvoicePdf> {
        self.latency.simulate().await;
        let ledger = self.ledger.read().await;
        if !ledger.invoices.iter().any(|i| i.id == invoice_id) {
            return Err(AcademyError::not_found("invoice", invoice_id));
        }
        Ok(InvoicePdf {
            invoice_id: invoice_id.to_string(),
            pdf_url: format!("{INVOICE_BASE_URL}/{invoice_id}.pdf"),
        })
    }
}
