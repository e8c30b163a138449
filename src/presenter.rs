use crate::models::{Event, Source};

const SEPARATOR: &str = "──────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestKind {
    /// Nothing dated today has been announced yet.
    NextDay,
    /// Something dated today was already announced; this batch adds to it.
    DailyUpdate,
}

pub fn digest_header(kind: DigestKind) -> &'static str {
    match kind {
        DigestKind::NextDay => "📅 **Freerolls in the next 24 hours:**",
        DigestKind::DailyUpdate => "🆕 **New daily summary, freshly listed freerolls:**",
    }
}

fn source_icon(source: Source) -> &'static str {
    match source {
        Source::FreerollPassword => "🌐",
        Source::FreerollPass => "🎯",
    }
}

pub fn render_event(event: &Event) -> String {
    let when = match event.time() {
        Some(time) => format!(
            "🕒 Start: **{} {}**",
            time.format("%H:%M"),
            event.date.format("%d.%m.%Y")
        ),
        None => format!("📅 Date: **{}** (all day)", event.date.format("%d.%m.%Y")),
    };

    let lines = [
        format!("💰 **{}**", event.name),
        format!("🏢 Room: **{}**", event.room),
        format!("💵 Prize: **{}**", event.prize),
        when,
        format!("🔑 Password: **{}**", event.password),
        format!("{} Source: {}", source_icon(event.source), event.source.id()),
        SEPARATOR.to_string(),
    ];
    lines.join("\n")
}

fn with_mention(mention: Option<&str>, headline: String) -> String {
    match mention {
        Some(mention) => format!("{mention} {headline}"),
        None => headline,
    }
}

pub fn one_hour_alert(mention: Option<&str>, minutes: i64, event: &Event) -> String {
    let headline = format!("⏰ **Starts in {minutes} minutes!**");
    format!("{}\n\n{}", with_mention(mention, headline), render_event(event))
}

pub fn ten_minute_alert(mention: Option<&str>, minutes: i64, event: &Event) -> String {
    let headline = format!("🚨 **HEADS UP! Starts in {minutes} minutes!**");
    format!("{}\n\n{}", with_mention(mention, headline), render_event(event))
}

pub fn next_event(minutes: i64, event: &Event) -> String {
    format!(
        "👉 **Next freeroll:**\n⏰ **Starts in {minutes} minutes!**\n\n{}",
        render_event(event)
    )
}
