//! Reply and inline keyboard layouts.
//!
//! Shapes follow the Telegram Bot API `reply_markup` JSON.

use serde_json::{Value, json};

/// Button texts for the pickup check. Routing matches these literally.
pub const PICKUP_YES: &str = "✅ Так, забрав(ла)";
pub const PICKUP_NO: &str = "❌ Ще ні";

/// Menu for chats that have not shared a phone number yet.
pub fn guest_keyboard() -> Value {
    json!({
        "keyboard": [
            [{"text": "📞 Поділитись номером", "request_contact": true}],
            [{"text": "💰 Ціни"}, {"text": "🪄 AI Оцінка вартості"}],
            [{"text": "📸 Наші роботи"}, {"text": "📍 Локація"}],
            [{"text": "📅 Графік"}, {"text": "📞 Контактний телефон"}],
            [{"text": "🆘 Допомога"}],
        ],
        "one_time_keyboard": true,
        "resize_keyboard": true,
    })
}

/// Menu for registered customers.
pub fn member_keyboard() -> Value {
    json!({
        "keyboard": [
            [{"text": "💰 Ціни"}, {"text": "🪄 AI Оцінка вартості"}],
            [{"text": "📸 Наші роботи"}, {"text": "📍 Локація"}],
            [{"text": "📅 Графік"}, {"text": "📞 Контактний телефон"}],
            [{"text": "🆘 Допомога"}],
        ],
        "one_time_keyboard": false,
        "resize_keyboard": true,
    })
}

/// Privileged menu.
pub fn admin_keyboard() -> Value {
    json!({
        "keyboard": [
            [{"text": "📊 Статистика"}],
            [{"text": "🧮 AI Калькулятор собівартості"}],
            [{"text": "📢 Розсилка"}],
        ],
        "one_time_keyboard": false,
        "resize_keyboard": true,
    })
}

/// Two-button yes/no control for the pickup check.
pub fn pickup_keyboard() -> Value {
    json!({
        "keyboard": [
            [{"text": PICKUP_YES}],
            [{"text": PICKUP_NO}],
        ],
        "resize_keyboard": true,
    })
}

/// One-shot 1–5 selection for the rating prompt.
pub fn rating_keyboard() -> Value {
    json!({
        "keyboard": [
            [{"text": "1"}, {"text": "2"}, {"text": "3"}, {"text": "4"}, {"text": "5"}],
        ],
        "resize_keyboard": true,
        "one_time_keyboard": true,
    })
}

/// Single inline button opening a URL.
pub fn inline_url_button(text: &str, url: &str) -> Value {
    json!({
        "inline_keyboard": [[{"text": text, "url": url}]]
    })
}
