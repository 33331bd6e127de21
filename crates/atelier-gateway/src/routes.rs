//! API route handlers and inbound text routing.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use serde_json::{Value, json};

use atelier_channels::keyboards;
use atelier_channels::telegram::{TelegramContact, TelegramUpdate};
use atelier_core::error::Result;
use atelier_core::types::ConversationState;
use atelier_feedback::PickupReply;
use atelier_services::estimator::AI_DISCLAIMER;
use atelier_services::pricing::{calculate_min_price, price_list_text};

use super::server::AppState;

const ESTIMATE_PROMPT: &str = "🧵 Опишіть своїми словами, що потрібно зробити? \
(Наприклад: 'Треба вкоротити джинси, але зберегти оригінальний шов' \
або 'Замінити блискавку на зимовій куртці').";
const ESTIMATE_ANALYZING: &str = "⏳ Аналізую запит...";
const ESTIMATE_UNAVAILABLE: &str = "⚠️ Вибачте, штучний інтелект тимчасово недоступний або не \
зміг обробити запит. Спробуйте пізніше або оберіть послугу з меню.";
const NOT_RECOGNIZED: &str = "🤔 Команда не розпізнана.";
const BACK_TO_MENU: &str = "Повертаємо вас до головного меню 🧵";
const ASK_FOR_PHONE: &str = "👋 Вітаємо! Щоб продовжити, поділіться своїм номером.";
const WELCOME_NEW: &str = "👋 Вітаємо! Щоб почати роботу, будь ласка, поділіться номером.";

/// What one inbound text resolves to, before access control.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Pickup(PickupReply),
    Rate(u8),
    Help,
    AdminMenu,
    Stats,
    BroadcastPanel,
    Broadcast(&'a str),
    Start,
    Portfolio,
    Location,
    Prices,
    EstimateStart,
    CostCalcStart,
    Schedule,
    ContactPhone,
    Other,
}

/// A bare digit 1–5 is a rating tap.
fn parse_rating(text: &str) -> Option<u8> {
    match text {
        "1" => Some(1),
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        "5" => Some(5),
        _ => None,
    }
}

/// Purely lexical routing; RBAC happens at dispatch.
fn route_text(text: &str) -> Command<'_> {
    if let Some(reply) = PickupReply::parse(text) {
        return Command::Pickup(reply);
    }
    if let Some(score) = parse_rating(text) {
        return Command::Rate(score);
    }
    match text {
        "/help" | "🆘 Допомога" => Command::Help,
        "/admin" => Command::AdminMenu,
        "📊 Статистика" | "📊 Stats" => Command::Stats,
        "📢 Розсилка" | "📢 Broadcast" => Command::BroadcastPanel,
        "📸 Наші роботи" | "📸 Our Work" => Command::Portfolio,
        "📍 Локація" | "Локація" | "/location" => Command::Location,
        "💰 Ціни" | "💰 Prices" => Command::Prices,
        "🪄 AI Оцінка вартості" => Command::EstimateStart,
        "🧮 AI Калькулятор собівартості" | "🧮 AI Калькулятор вартості" => {
            Command::CostCalcStart
        }
        "📅 Графік" | "Графік" => Command::Schedule,
        "📞 Контактний телефон" | "Контактний телефон" => Command::ContactPhone,
        _ => {
            if let Some(rest) = text.strip_prefix("/broadcast") {
                return Command::Broadcast(rest.trim());
            }
            if text.starts_with("/start") {
                return Command::Start;
            }
            Command::Other
        }
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() > 50 {
        format!("{}...", text.chars().take(50).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Normalize a shared phone number to the `+`-prefixed form used as the
/// directory key.
fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        trimmed.to_string()
    } else {
        format!("+{trimmed}")
    }
}

// ==========================
//  TELEGRAM WEBHOOK
// ==========================

pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    Json(update): Json<TelegramUpdate>,
) -> Json<Value> {
    let Some(message) = update.message else {
        return Json(json!({"ok": true}));
    };
    let chat_id = message.chat.id.to_string();

    let outcome = if let Some(text) = message.text.as_deref() {
        handle_text(&state, &chat_id, text.trim()).await
    } else if let Some(contact) = message.contact {
        handle_contact(&state, &chat_id, &contact).await
    } else {
        Ok(())
    };

    if let Err(e) = outcome {
        tracing::error!("❌ Webhook handling failed | chat_id={chat_id} | {e}");
    }
    Json(json!({"ok": true}))
}

async fn handle_text(state: &AppState, chat_id: &str, text: &str) -> Result<()> {
    tracing::info!("📩 Received text from {chat_id} | \"{}\"", snippet(text));
    let is_admin = state.config.admin.is_admin(chat_id);

    if state.db.conversation_state(chat_id)? == ConversationState::AwaitingEstimate {
        state
            .db
            .set_conversation_state(chat_id, ConversationState::Idle)?;
        // A command or menu tap abandons the estimate flow.
        if !text.starts_with('/') && route_text(text) == Command::Other {
            return run_estimate(state, chat_id, text, is_admin).await;
        }
    }

    match route_text(text) {
        Command::Pickup(reply) => {
            tracing::info!("📩 Feedback pickup response from {chat_id}");
            state
                .feedback
                .handle_pickup_response(chat_id, reply, Utc::now())
                .await?;
        }
        Command::Rate(score) => {
            tracing::info!("📩 Feedback rating from {chat_id} | score={score}");
            state.feedback.handle_rating(chat_id, score).await?;
        }
        Command::Help => {
            let text = format!(
                "🆘 Потрібна допомога?\n\
                 Якщо у вас є питання щодо замовлення, звертайтеся напряму:\n\
                 👤 {}\n📞 {}",
                state.config.location.support_username, state.config.location.contact_phone
            );
            state.telegram.send_message(chat_id, &text, None, None).await;
        }
        Command::AdminMenu => {
            if is_admin {
                state
                    .telegram
                    .send_message(
                        chat_id,
                        "🔐 Адмін меню",
                        Some(keyboards::admin_keyboard()),
                        None,
                    )
                    .await;
            } else {
                state
                    .telegram
                    .send_message(chat_id, NOT_RECOGNIZED, None, None)
                    .await;
                welcome_flow(state, chat_id).await?;
            }
        }
        Command::Stats => {
            if is_admin {
                state.admin.send_stats(chat_id).await?;
            } else {
                redirect_to_start(state, chat_id).await;
            }
        }
        Command::BroadcastPanel => {
            if is_admin {
                state.admin.send_broadcast_instructions(chat_id).await;
            } else {
                redirect_to_start(state, chat_id).await;
            }
        }
        Command::Broadcast(body) => {
            if is_admin {
                state.admin.broadcast(chat_id, body).await?;
            } else {
                redirect_to_start(state, chat_id).await;
            }
        }
        Command::Start => {
            welcome_flow(state, chat_id).await?;
        }
        Command::Portfolio => {
            let url = &state.config.links.instagram_url;
            let text = format!(
                "👀 *Подивіться наше портфоліо!*\n\nОсь наші останні роботи:\n{url}"
            );
            state
                .telegram
                .send_message(
                    chat_id,
                    &text,
                    Some(keyboards::inline_url_button("Відкрити Instagram", url)),
                    Some("Markdown"),
                )
                .await;
        }
        Command::Location => {
            state.location.send_location_details(chat_id).await;
        }
        Command::Prices => {
            state
                .telegram
                .send_message(chat_id, &price_list_text(), None, Some("Markdown"))
                .await;
        }
        Command::EstimateStart => {
            state
                .db
                .set_conversation_state(chat_id, ConversationState::AwaitingEstimate)?;
            state
                .telegram
                .send_message(chat_id, ESTIMATE_PROMPT, None, None)
                .await;
        }
        Command::CostCalcStart => {
            if is_admin {
                state
                    .db
                    .set_conversation_state(chat_id, ConversationState::AwaitingEstimate)?;
                state
                    .telegram
                    .send_message(chat_id, ESTIMATE_PROMPT, None, None)
                    .await;
            } else {
                redirect_to_start(state, chat_id).await;
            }
        }
        Command::Schedule => {
            state
                .telegram
                .send_message(chat_id, &state.config.location.schedule_text, None, None)
                .await;
        }
        Command::ContactPhone => {
            let text = format!("📞 {}", state.config.location.contact_phone);
            state.telegram.send_message(chat_id, &text, None, None).await;
        }
        Command::Other => {
            // Unrecognized chatter; nothing to do.
        }
    }
    Ok(())
}

/// Price the described task and answer with either the client estimate or
/// the admin cost breakdown.
async fn run_estimate(state: &AppState, chat_id: &str, text: &str, is_admin: bool) -> Result<()> {
    state
        .telegram
        .send_message(chat_id, ESTIMATE_ANALYZING, None, None)
        .await;

    let estimate = state.estimator.analyze(text).await;
    let menu = main_menu_markup(state, chat_id, is_admin)?;

    let Ok(pricing) = calculate_min_price(estimate.estimated_minutes, &state.config.pricing)
    else {
        state
            .telegram
            .send_message(chat_id, ESTIMATE_UNAVAILABLE, Some(menu), None)
            .await;
        return Ok(());
    };

    let response = if is_admin {
        let economics = &state.config.pricing;
        format!(
            "🧮 *AI Калькулятор собівартості:*\n\
             Завдання: _{}_\n\
             Оцінений час: *{} хв*\n\n\
             💰 *Вартість:*\n\
             - Робота (час): {} грн\n\
             - Амортизація та комунальні: {} грн\n\
             - Матеріали: {} грн\n\
             - Податок ({}%): {} грн\n\n\
             🏆 *Мінімальна ціна для клієнта: {} грн*",
            estimate.task_summary,
            estimate.estimated_minutes,
            pricing.labor,
            pricing.overhead + economics.depreciation_fee.round() as i64,
            economics.consumables_fee.round() as i64,
            (economics.tax_rate * 100.0).round() as i64,
            pricing.tax,
            pricing.final_price,
        )
    } else {
        format!(
            "🪄 *Попередня оцінка AI:*\n\
             Завдання: _{}_\n\
             Орієнтовна вартість: *~{} грн*{AI_DISCLAIMER}",
            estimate.task_summary, pricing.final_price,
        )
    };

    state
        .telegram
        .send_message(chat_id, &response, Some(menu), Some("Markdown"))
        .await;
    Ok(())
}

async fn handle_contact(state: &AppState, chat_id: &str, contact: &TelegramContact) -> Result<()> {
    let phone = normalize_phone(&contact.phone_number);
    let name = contact.first_name.clone().unwrap_or_else(|| "Client".into());

    state.db.upsert_customer(&phone, &name, chat_id)?;
    tracing::info!("✅ Saved customer contact | chat_id={chat_id} | phone={phone}");

    let instagram = &state.config.links.instagram_url;
    let text = format!(
        "✅ *Дякуємо, зберегли ваш номер!*\n\n\
         Коли замовлення буде готове, бот надішле сповіщення тут.\n\
         Щоб не пропустити оновлення, збережіть цей чат.\n\n\
         Поки чекаєте, зазирніть у наш Instagram 👇\n{instagram}"
    );
    state
        .telegram
        .send_message(
            chat_id,
            &text,
            Some(keyboards::inline_url_button("Відкрити Instagram", instagram)),
            Some("Markdown"),
        )
        .await;

    // Re-open the reply keyboard so the location button stays visible.
    state
        .telegram
        .send_message(
            chat_id,
            "Натисніть \"📍 Локація\" щоб отримати адресу та \"📞 Контактний телефон\" для дзвінка.",
            Some(keyboards::member_keyboard()),
            None,
        )
        .await;
    Ok(())
}

async fn welcome_flow(state: &AppState, chat_id: &str) -> Result<()> {
    match state.db.customer_by_chat_id(chat_id)? {
        Some(customer) => {
            let name = if customer.name.is_empty() {
                "друже".to_string()
            } else {
                customer.name
            };
            tracing::info!("✅ Welcome flow | {chat_id} (member)");
            state
                .telegram
                .send_message(
                    chat_id,
                    &format!("🎉 З поверненням, {name}! Чим можемо допомогти?"),
                    Some(keyboards::member_keyboard()),
                    None,
                )
                .await;
        }
        None => {
            tracing::info!("📩 Welcome flow | {chat_id} (new) — requesting phone");
            state
                .telegram
                .send_message(chat_id, WELCOME_NEW, Some(keyboards::guest_keyboard()), None)
                .await;
        }
    }
    Ok(())
}

/// Non-admin attempt at a privileged action: back to the start flow.
async fn redirect_to_start(state: &AppState, chat_id: &str) {
    state
        .telegram
        .send_message(chat_id, BACK_TO_MENU, None, None)
        .await;
    state
        .telegram
        .send_message(chat_id, ASK_FOR_PHONE, Some(keyboards::guest_keyboard()), None)
        .await;
}

fn main_menu_markup(state: &AppState, chat_id: &str, is_admin: bool) -> Result<Value> {
    if is_admin {
        return Ok(keyboards::admin_keyboard());
    }
    Ok(if state.db.customer_by_chat_id(chat_id)?.is_some() {
        keyboards::member_keyboard()
    } else {
        keyboards::guest_keyboard()
    })
}

// ==========================
//  INTERNAL TRIGGER API
// ==========================

/// Order-ready trigger, called by the shop's order system.
pub async fn trigger_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("X-Internal-API-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let expected = &state.config.gateway.internal_api_key;
    if expected.is_empty() || key != expected {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"ok": false, "error": "Unauthorized"})),
        );
    }

    let phone = body["phone_number"]
        .as_str()
        .or_else(|| body["phone"].as_str())
        .unwrap_or("");

    match state.notifier.notify_order_ready(phone, Utc::now()).await {
        Ok(outcome) => (StatusCode::OK, Json(json!({"status": outcome.as_status()}))),
        Err(e) => {
            tracing::error!("❌ Order-ready trigger failed | {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
        }
    }
}

// ==========================
//  CRON & HEALTH
// ==========================

/// Periodic trigger: process every due feedback task.
pub async fn check_feedback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let token = params.get("token").map(String::as_str).unwrap_or("");
    let expected = &state.config.gateway.cron_secret;
    if expected.is_empty() || token != expected {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"ok": false, "error": "Forbidden"})),
        );
    }

    match state.feedback.process_due_tasks(Utc::now()).await {
        Ok(processed) => (StatusCode::OK, Json(json!({"processed": processed}))),
        Err(e) => {
            tracing::error!("❌ Due-task processing failed | {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
        }
    }
}

/// Liveness probe.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "atelier-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atelier_channels::telegram::Messenger;
    use atelier_core::AtelierConfig;
    use atelier_core::types::FeedbackStatus;
    use atelier_store::AtelierDb;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Sent {
        chat_id: String,
        text: String,
        keyboard: Option<Value>,
    }

    struct RecordingMessenger {
        sent: Mutex<Vec<Sent>>,
    }

    impl RecordingMessenger {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_message(
            &self,
            chat_id: &str,
            text: &str,
            keyboard: Option<Value>,
            _parse_mode: Option<&str>,
        ) -> bool {
            self.sent.lock().unwrap().push(Sent {
                chat_id: chat_id.to_string(),
                text: text.to_string(),
                keyboard,
            });
            true
        }

        async fn send_location(&self, chat_id: &str, _lat: f64, _lon: f64) -> bool {
            self.sent.lock().unwrap().push(Sent {
                chat_id: chat_id.to_string(),
                text: "<location>".into(),
                keyboard: None,
            });
            true
        }

        async fn send_video(&self, chat_id: &str, _url: &str, _cap: Option<&str>) -> bool {
            self.sent.lock().unwrap().push(Sent {
                chat_id: chat_id.to_string(),
                text: "<video>".into(),
                keyboard: None,
            });
            true
        }
    }

    fn test_state() -> (State<Arc<AppState>>, Arc<RecordingMessenger>) {
        let mut config = AtelierConfig::default();
        config.admin.chat_ids = vec!["4242".into()];
        config.gateway.internal_api_key = "test_secret_key".into();
        config.gateway.cron_secret = "cron_secret".into();
        config.location.contact_phone = "073 436 5788".into();

        let db = Arc::new(AtelierDb::open_in_memory().unwrap());
        let messenger = RecordingMessenger::new();
        let state = Arc::new(AppState::new(config, db, messenger.clone()));
        (State(state), messenger)
    }

    fn text_update(chat_id: i64, text: &str) -> Json<TelegramUpdate> {
        Json(serde_json::from_value(json!({
            "update_id": 1,
            "message": {"chat": {"id": chat_id}, "text": text}
        }))
        .unwrap())
    }

    // ---- Routing ----

    #[test]
    fn test_route_text_feedback_inputs() {
        assert_eq!(
            route_text(keyboards::PICKUP_YES),
            Command::Pickup(PickupReply::PickedUp)
        );
        assert_eq!(
            route_text(keyboards::PICKUP_NO),
            Command::Pickup(PickupReply::NotYet)
        );
        assert_eq!(route_text("3"), Command::Rate(3));
        assert_eq!(route_text("6"), Command::Other);
        assert_eq!(route_text("33"), Command::Other);
    }

    #[test]
    fn test_route_text_commands() {
        assert_eq!(route_text("/start"), Command::Start);
        assert_eq!(route_text("/start ORD-123"), Command::Start);
        assert_eq!(route_text("/admin"), Command::AdminMenu);
        assert_eq!(route_text("/help"), Command::Help);
        assert_eq!(
            route_text("/broadcast Привіт"),
            Command::Broadcast("Привіт")
        );
        assert_eq!(route_text("💰 Ціни"), Command::Prices);
        assert_eq!(route_text("📍 Локація"), Command::Location);
        assert_eq!(route_text("🪄 AI Оцінка вартості"), Command::EstimateStart);
        assert_eq!(route_text("📅 Графік"), Command::Schedule);
        assert_eq!(route_text("будь-який текст"), Command::Other);
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("1234567890"), "+1234567890");
        assert_eq!(normalize_phone("+380501234567"), "+380501234567");
        assert_eq!(normalize_phone("  380501234567 "), "+380501234567");
    }

    // ---- Health ----

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check().await;
        assert_eq!(result.0["status"], "ok");
        assert_eq!(result.0["service"], "atelier-gateway");
    }

    // ---- Webhook ----

    #[tokio::test]
    async fn test_start_from_unknown_user_requests_phone() {
        let (state, messenger) = test_state();

        telegram_webhook(state, text_update(12345, "/start")).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "12345");
        assert!(sent[0].text.contains("поділіться номером"));
        assert_eq!(sent[0].keyboard, Some(keyboards::guest_keyboard()));
    }

    #[tokio::test]
    async fn test_start_from_member_greets_by_name() {
        let (state, messenger) = test_state();
        state.0.db.upsert_customer("+1", "Mila", "101").unwrap();

        telegram_webhook(state, text_update(101, "/start")).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Mila"));
        assert_eq!(sent[0].keyboard, Some(keyboards::member_keyboard()));
    }

    #[tokio::test]
    async fn test_admin_menu_rbac() {
        let (state, messenger) = test_state();

        telegram_webhook(state.clone(), text_update(4242, "/admin")).await;
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Адмін меню"));
        assert_eq!(sent[0].keyboard, Some(keyboards::admin_keyboard()));

        // Non-admin gets bounced into the welcome flow.
        telegram_webhook(state, text_update(777, "/admin")).await;
        let sent = messenger.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].text, NOT_RECOGNIZED);
        assert!(sent[2].text.contains("поділіться номером"));
    }

    #[tokio::test]
    async fn test_stats_rbac() {
        let (state, messenger) = test_state();
        state.0.db.upsert_customer("+1", "A", "10").unwrap();

        telegram_webhook(state.clone(), text_update(4242, "📊 Статистика")).await;
        assert!(messenger.sent()[0].text.contains("*1*"));

        telegram_webhook(state, text_update(10, "📊 Статистика")).await;
        let sent = messenger.sent();
        assert_eq!(sent[1].text, BACK_TO_MENU);
        assert_eq!(sent[2].text, ASK_FOR_PHONE);
    }

    #[tokio::test]
    async fn test_contact_share_registers_customer() {
        let (state, messenger) = test_state();
        let update: Json<TelegramUpdate> = Json(
            serde_json::from_value(json!({
                "message": {
                    "chat": {"id": 999},
                    "contact": {"phone_number": "1234567890", "first_name": "Alice"}
                }
            }))
            .unwrap(),
        );

        telegram_webhook(state.clone(), update).await;

        let customer = state
            .0
            .db
            .customer_by_phone("+1234567890")
            .unwrap()
            .unwrap();
        assert_eq!(customer.name, "Alice");
        assert_eq!(customer.chat_id, "999");

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text.contains("зберегли ваш номер"));
        assert_eq!(sent[1].keyboard, Some(keyboards::member_keyboard()));
    }

    #[tokio::test]
    async fn test_pickup_tap_without_task_sends_nothing() {
        let (state, messenger) = test_state();
        state.0.db.upsert_customer("+1", "A", "10").unwrap();

        telegram_webhook(state, text_update(10, keyboards::PICKUP_YES)).await;
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rating_tap_reaches_state_machine() {
        let (state, messenger) = test_state();
        let customer = state.0.db.upsert_customer("+1", "A", "10").unwrap();
        state
            .0
            .db
            .create_task(
                customer.id,
                Utc::now(),
                Utc::now(),
                FeedbackStatus::Completed,
            )
            .unwrap();

        telegram_webhook(state, text_update(10, "5")).await;
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "10");
    }

    #[tokio::test]
    async fn test_estimate_flow_round_trip() {
        let (state, messenger) = test_state();
        state.0.db.upsert_customer("+1", "A", "10").unwrap();

        // Tap the AI button, then describe the task. The estimator has no
        // key in tests, so the fallback estimate (60 min) is priced.
        telegram_webhook(state.clone(), text_update(10, "🪄 AI Оцінка вартості")).await;
        telegram_webhook(state, text_update(10, "вкоротити джинси")).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].text, ESTIMATE_PROMPT);
        assert_eq!(sent[1].text, ESTIMATE_ANALYZING);
        assert!(sent[2].text.contains("Попередня оцінка AI"));
        assert!(sent[2].text.contains("223")); // 60 min at default economics
        assert_eq!(sent[2].keyboard, Some(keyboards::member_keyboard()));
    }

    #[tokio::test]
    async fn test_estimate_flow_admin_gets_breakdown() {
        let (state, messenger) = test_state();

        telegram_webhook(
            state.clone(),
            text_update(4242, "🧮 AI Калькулятор собівартості"),
        )
        .await;
        telegram_webhook(state, text_update(4242, "замінити блискавку")).await;

        let sent = messenger.sent();
        let last = &sent[sent.len() - 1].text;
        assert!(last.contains("Мінімальна ціна для клієнта"));
        assert!(last.contains("Податок (5%)"));
    }

    #[tokio::test]
    async fn test_menu_tap_abandons_estimate_flow() {
        let (state, messenger) = test_state();
        state.0.db.upsert_customer("+1", "A", "10").unwrap();

        telegram_webhook(state.clone(), text_update(10, "🪄 AI Оцінка вартості")).await;
        telegram_webhook(state.clone(), text_update(10, "💰 Ціни")).await;

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].text.contains("Вкорочення"));
        assert_eq!(
            state.0.db.conversation_state("10").unwrap(),
            ConversationState::Idle
        );
    }

    // ---- Internal trigger ----

    #[tokio::test]
    async fn test_trigger_unauthorized() {
        let (state, _messenger) = test_state();
        let (status, _) =
            trigger_notification(state, HeaderMap::new(), Json(json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_trigger_success_schedules_follow_up() {
        let (state, messenger) = test_state();
        let customer = state.0.db.upsert_customer("+123", "Bob", "555").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("X-Internal-API-Key", "test_secret_key".parse().unwrap());
        let (status, body) = trigger_notification(
            state.clone(),
            headers,
            Json(json!({"phone_number": "+123"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["status"], "Success");
        assert_eq!(messenger.sent().len(), 1);
        assert!(
            state
                .0
                .db
                .latest_task_for_customer(customer.id, FeedbackStatus::ACTIVE)
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_trigger_unknown_phone_reports_failure() {
        let (state, _messenger) = test_state();
        let mut headers = HeaderMap::new();
        headers.insert("X-Internal-API-Key", "test_secret_key".parse().unwrap());
        let (status, body) =
            trigger_notification(state, headers, Json(json!({"phone": "+999"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["status"], "Failed: User not found (Not subscribed to bot)");
    }

    // ---- Cron ----

    #[tokio::test]
    async fn test_check_feedback_forbidden_without_token() {
        let (state, _messenger) = test_state();
        let (status, _) = check_feedback(state, Query(HashMap::new())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_check_feedback_reports_processed_count() {
        let (state, messenger) = test_state();
        let customer = state.0.db.upsert_customer("+1", "A", "10").unwrap();
        state
            .0
            .db
            .create_task(
                customer.id,
                Utc::now() - chrono::Duration::hours(1),
                Utc::now() - chrono::Duration::minutes(1),
                FeedbackStatus::Pending,
            )
            .unwrap();

        let params: HashMap<String, String> =
            [("token".to_string(), "cron_secret".to_string())].into();
        let (status, body) = check_feedback(state, Query(params)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.0["processed"], 1);
        assert_eq!(messenger.sent().len(), 1);
    }
}
