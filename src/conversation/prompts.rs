//! Fixed user-facing texts for each conversation step.

use super::state::ConversationState;
use crate::error::ParseFailure;

/// Label of the inline button that requests the summary.
pub const SUMMARY_BUTTON_LABEL: &str = "Получить сводку";

pub const HELP: &str = "\
Я помогу спланировать поездку: задам несколько вопросов и соберу сводку \
с билетами, жильём, едой и местами.

Команды:
/start — начать заново
/cancel — прервать диалог
/help — эта справка";

pub const CANCELLED: &str = "Диалог прерван. Чтобы начать заново, отправьте /start.";

pub const ALREADY_CANCELLED: &str = "Диалог уже завершён. Чтобы начать заново, отправьте /start.";

/// Question asked on entering `state`.
pub fn step_prompt(state: ConversationState) -> &'static str {
    match state {
        ConversationState::AwaitingTrip => "\
Куда и когда едем? Напишите одной строкой через запятую:
откуда, куда, ГГГГ-ММ-ДД - ГГГГ-ММ-ДД, количество гостей

Например: Москва, Санкт-Петербург, 2025-07-01 - 2025-07-05, 2",

        ConversationState::AwaitingAccommodation => "\
Какое жильё ищем? Опишите пожелания и бюджет за ночь, например:
отель в центре, до 6000 руб",

        ConversationState::AwaitingFood => "\
Какую кухню предпочитаете? Перечислите через запятую, например:
грузинская, итальянская, вегетарианская",

        ConversationState::AwaitingPlaces => "\
Что хотите посмотреть? Перечислите через запятую, например:
музеи, театры, парки

Можно оставить пустым: отправьте «-».",

        ConversationState::AwaitingSummaryRequest => {
            "Готово! Я ищу варианты. Нажмите «Получить сводку», когда будете готовы."
        }

        ConversationState::Terminated => CANCELLED,
    }
}

/// Greeting sent on /start, followed by the trip question.
pub fn welcome() -> String {
    format!(
        "Привет! Давайте спланируем поездку.\n\n{}",
        step_prompt(ConversationState::AwaitingTrip)
    )
}

/// Re-prompt after a failed trip answer.
pub fn retry(failure: &ParseFailure) -> String {
    format!(
        "{failure}.\n\n{}",
        step_prompt(ConversationState::AwaitingTrip)
    )
}
