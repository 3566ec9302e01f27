//! 面向用户的文案
//!
//! 机器人面向俄语用户，所有可见文本集中在这里

use crate::application::ports::ReleaseInfo;
use crate::domain::Release;

pub const SEARCH_BUTTON: &str = "🔍 Поиск";
pub const SUBSCRIPTIONS_BUTTON: &str = "❤️ Подписки";

/// 常驻菜单按钮；搜索中收到这些文本时不作为查询词
pub const MENU_BUTTONS: [&str; 2] = [SEARCH_BUTTON, SUBSCRIPTIONS_BUTTON];

pub const GREETING: &str = "Хай";
pub const SEARCH_PROMPT: &str = "Введите название тайтла\n\n/cancel - для отмены";
pub const NOTHING_FOUND: &str =
    "Ничего не найдено, попробуйте другое название\n\n/cancel - для отмены";
pub const SUBSCRIBE_BUTTON: &str = "Подписаться";
pub const SEARCH_CANCELLED: &str = "Поиск отменён";
pub const FETCH_FAILED: &str = "Не удалось получить данные с сайта, попробуйте ещё раз";
pub const TITLE_UNAVAILABLE: &str = "Тайтл недоступен, попробуйте найти другой";
pub const SELECTION_EXPIRED: &str = "Выбор устарел, выполните поиск заново";
pub const NO_SUBSCRIPTIONS: &str = "У вас нет подписок";
pub const SUBSCRIPTIONS_HEADER: &str = "Ваши подписки (нажмите, чтобы отписаться):";
pub const INTERNAL_ERROR: &str = "Что-то пошло не так, попробуйте позже";

pub fn is_menu_button(text: &str) -> bool {
    MENU_BUTTONS.contains(&text)
}

pub fn found(count: usize) -> String {
    format!("Найдено {} тайтлов", count)
}

pub fn release_card(info: &ReleaseInfo) -> String {
    let mut text = format!("{}\nПоследняя глава: {}", info.name, info.release);
    if let Some(image_url) = &info.image_url {
        text.push('\n');
        text.push_str(image_url);
    }
    text
}

pub fn subscribed(name: &str) -> String {
    format!("Вы успешно подписались на {}", name)
}

pub fn already_subscribed(name: &str) -> String {
    format!("Вы уже подписаны на {}", name)
}

pub fn unsubscribed(name: &str) -> String {
    format!("Вы отписались от {}", name)
}

/// 订阅列表标题；列表被截断时注明展示数量
pub fn subscriptions_header(shown: usize, total: usize) -> String {
    if shown >= total {
        return SUBSCRIPTIONS_HEADER.to_string();
    }
    format!("{}\nПоказаны первые {} из {}", SUBSCRIPTIONS_HEADER, shown, total)
}

pub fn subscription_button(name: &str, release: Release) -> String {
    format!("{} ({})", name, release)
}

pub fn new_release(name: &str, release: Release) -> String {
    format!("Вышла новая глава {}\n\n{}", name, release)
}
