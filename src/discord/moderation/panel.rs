// The `/direct` button panel and its modal forms.
//
// Component ids are plain strings with a fixed prefix so the event handler can
// route clicks and submissions after a restart without any collector state.

use crate::core::moderation::timeout_duration;
use crate::discord::moderation::actions::{execute, ModAction};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use poise::Modal;

const PREFIX: &str = "modlimit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Timeout,
    Kick,
    Ban,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Timeout,
    Untimeout,
    Kick,
    Ban,
}

impl MenuKind {
    fn as_str(self) -> &'static str {
        match self {
            MenuKind::Timeout => "timeout",
            MenuKind::Kick => "kick",
            MenuKind::Ban => "ban",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(MenuKind::Timeout),
            "kick" => Some(MenuKind::Kick),
            "ban" => Some(MenuKind::Ban),
            _ => None,
        }
    }

    /// The forms reachable from this sub-menu.
    fn forms(self) -> &'static [FormKind] {
        match self {
            MenuKind::Timeout => &[FormKind::Timeout, FormKind::Untimeout],
            MenuKind::Kick => &[FormKind::Kick],
            MenuKind::Ban => &[FormKind::Ban],
        }
    }
}

impl FormKind {
    fn as_str(self) -> &'static str {
        match self {
            FormKind::Timeout => "timeout",
            FormKind::Untimeout => "untimeout",
            FormKind::Kick => "kick",
            FormKind::Ban => "ban",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(FormKind::Timeout),
            "untimeout" => Some(FormKind::Untimeout),
            "kick" => Some(FormKind::Kick),
            "ban" => Some(FormKind::Ban),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FormKind::Timeout => "Timeout",
            FormKind::Untimeout => "Untimeout",
            FormKind::Kick => "Kick",
            FormKind::Ban => "Ban",
        }
    }
}

/// Every custom id this module hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelId {
    /// Top-level panel button, opens a sub-menu.
    Menu(MenuKind),
    /// Sub-menu button, opens a modal.
    Form(FormKind),
    /// Modal submission.
    Submit(FormKind),
}

impl PanelId {
    pub fn custom_id(&self) -> String {
        match self {
            PanelId::Menu(kind) => format!("{PREFIX}:menu:{}", kind.as_str()),
            PanelId::Form(kind) => format!("{PREFIX}:form:{}", kind.as_str()),
            PanelId::Submit(kind) => format!("{PREFIX}:submit:{}", kind.as_str()),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let mut parts = custom_id.splitn(3, ':');
        if parts.next()? != PREFIX {
            return None;
        }
        let stage = parts.next()?;
        let kind = parts.next()?;
        match stage {
            "menu" => MenuKind::parse(kind).map(PanelId::Menu),
            "form" => FormKind::parse(kind).map(PanelId::Form),
            "submit" => FormKind::parse(kind).map(PanelId::Submit),
            _ => None,
        }
    }
}

#[derive(Debug, poise::Modal)]
#[name = "Timeout a member"]
pub struct TimeoutForm {
    #[name = "User (mention, id or name)"]
    #[max_length = 100]
    pub user: String,
    #[name = "Seconds"]
    #[max_length = 10]
    pub seconds: Option<String>,
    #[name = "Minutes"]
    #[max_length = 10]
    pub minutes: Option<String>,
    #[name = "Hours"]
    #[max_length = 10]
    pub hours: Option<String>,
    #[name = "Bypass code (only when over the limit)"]
    #[max_length = 64]
    pub bypass_code: Option<String>,
}

#[derive(Debug, poise::Modal)]
#[name = "Lift a timeout"]
pub struct UntimeoutForm {
    #[name = "User (mention, id or name)"]
    #[max_length = 100]
    pub user: String,
}

#[derive(Debug, poise::Modal)]
#[name = "Kick a member"]
pub struct KickForm {
    #[name = "User (mention, id or name)"]
    #[max_length = 100]
    pub user: String,
    #[name = "Bypass code (only when over the limit)"]
    #[max_length = 64]
    pub bypass_code: Option<String>,
}

#[derive(Debug, poise::Modal)]
#[name = "Ban a member"]
pub struct BanForm {
    #[name = "User (mention, id or name)"]
    #[max_length = 100]
    pub user: String,
    #[name = "Bypass code (only when over the limit)"]
    #[max_length = 64]
    pub bypass_code: Option<String>,
}

/// The message body of the top-level panel.
pub fn panel_message() -> (serenity::CreateEmbed, Vec<serenity::CreateActionRow>) {
    let embed = serenity::CreateEmbed::new()
        .title("🛡️ Moderation panel")
        .description("Pick an action. Daily limits apply per moderator.")
        .color(0x5865F2);

    let buttons = vec![serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(PanelId::Menu(MenuKind::Timeout).custom_id())
            .label("TIMEOUT")
            .style(serenity::ButtonStyle::Primary),
        serenity::CreateButton::new(PanelId::Menu(MenuKind::Kick).custom_id())
            .label("KICK")
            .style(serenity::ButtonStyle::Secondary),
        serenity::CreateButton::new(PanelId::Menu(MenuKind::Ban).custom_id())
            .label("BAN")
            .style(serenity::ButtonStyle::Danger),
    ])];

    (embed, buttons)
}

fn submenu_buttons(menu: MenuKind) -> Vec<serenity::CreateActionRow> {
    let buttons = menu
        .forms()
        .iter()
        .map(|form| {
            let style = match form {
                FormKind::Ban => serenity::ButtonStyle::Danger,
                FormKind::Untimeout => serenity::ButtonStyle::Success,
                _ => serenity::ButtonStyle::Primary,
            };
            serenity::CreateButton::new(PanelId::Form(*form).custom_id())
                .label(form.label())
                .style(style)
        })
        .collect();
    vec![serenity::CreateActionRow::Buttons(buttons)]
}

fn form_response(form: FormKind) -> serenity::CreateInteractionResponse {
    let custom_id = PanelId::Submit(form).custom_id();
    match form {
        FormKind::Timeout => TimeoutForm::create(None, custom_id),
        FormKind::Untimeout => UntimeoutForm::create(None, custom_id),
        FormKind::Kick => KickForm::create(None, custom_id),
        FormKind::Ban => BanForm::create(None, custom_id),
    }
}

/// Handle a button press on the panel or one of its sub-menus.
pub async fn handle_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let response = match PanelId::parse(&component.data.custom_id) {
        Some(PanelId::Menu(menu)) => serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new()
                .content(format!("Choose a {} action:", menu.as_str()))
                .components(submenu_buttons(menu))
                .ephemeral(true),
        ),
        Some(PanelId::Form(form)) => form_response(form),
        _ => return Ok(()),
    };

    component.create_response(&ctx.http, response).await?;
    Ok(())
}

fn parse_form<M: Modal>(data: &serenity::ModalInteractionData) -> Result<M, Error> {
    M::parse(data.clone()).map_err(|e| Error::from(e.to_string()))
}

/// Shown in place of the deferred reply when a form cannot be processed.
fn failure_reply(e: &Error) -> String {
    format!("❌ {e}")
}

async fn run_form(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    data: &Data,
    guild_id: serenity::GuildId,
    form: FormKind,
) -> Result<String, Error> {
    let moderator = &modal.user;
    let reply = match form {
        FormKind::Timeout => {
            let input: TimeoutForm = parse_form(&modal.data)?;
            match timeout_duration(
                input.seconds.as_deref(),
                input.minutes.as_deref(),
                input.hours.as_deref(),
            ) {
                Ok(duration) => {
                    execute(
                        ctx,
                        data,
                        guild_id,
                        moderator,
                        &input.user,
                        ModAction::Timeout(duration),
                        input.bypass_code.as_deref(),
                    )
                    .await?
                }
                Err(e) => format!("❌ {e}."),
            }
        }
        FormKind::Untimeout => {
            let input: UntimeoutForm = parse_form(&modal.data)?;
            execute(ctx, data, guild_id, moderator, &input.user, ModAction::Untimeout, None)
                .await?
        }
        FormKind::Kick => {
            let input: KickForm = parse_form(&modal.data)?;
            execute(
                ctx,
                data,
                guild_id,
                moderator,
                &input.user,
                ModAction::Kick,
                input.bypass_code.as_deref(),
            )
            .await?
        }
        FormKind::Ban => {
            let input: BanForm = parse_form(&modal.data)?;
            execute(
                ctx,
                data,
                guild_id,
                moderator,
                &input.user,
                ModAction::Ban,
                input.bypass_code.as_deref(),
            )
            .await?
        }
    };
    Ok(reply)
}

/// Run the action behind a submitted modal and edit the deferred reply.
pub async fn handle_modal(
    ctx: &serenity::Context,
    modal: &serenity::ModalInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(PanelId::Submit(form)) = PanelId::parse(&modal.data.custom_id) else {
        return Ok(());
    };

    let Some(guild_id) = modal.guild_id else {
        modal
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .content("This only works in servers.")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    modal.defer_ephemeral(&ctx.http).await?;

    let reply = match run_form(ctx, modal, data, guild_id, form).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(
                guild_id = guild_id.get(),
                user_id = modal.user.id.get(),
                ?form,
                "Panel form failed: {}",
                e
            );
            failure_reply(&e)
        }
    };

    modal
        .edit_response(
            &ctx.http,
            serenity::EditInteractionResponse::new().content(reply),
        )
        .await?;
    Ok(())
}

/// Route any interaction that belongs to the panel.
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    match interaction {
        serenity::Interaction::Component(component) => handle_component(ctx, component).await,
        serenity::Interaction::Modal(modal) => handle_modal(ctx, modal, data).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_back() {
        let ids = [
            PanelId::Menu(MenuKind::Timeout),
            PanelId::Menu(MenuKind::Kick),
            PanelId::Menu(MenuKind::Ban),
            PanelId::Form(FormKind::Untimeout),
            PanelId::Submit(FormKind::Ban),
        ];
        for id in ids {
            assert_eq!(PanelId::parse(&id.custom_id()), Some(id));
        }
    }

    #[test]
    fn ids_have_stable_text() {
        assert_eq!(
            PanelId::Menu(MenuKind::Timeout).custom_id(),
            "modlimit:menu:timeout"
        );
        assert_eq!(
            PanelId::Submit(FormKind::Kick).custom_id(),
            "modlimit:submit:kick"
        );
    }

    #[test]
    fn foreign_ids_are_ignored() {
        assert_eq!(PanelId::parse("prev"), None);
        assert_eq!(PanelId::parse("modlimit:menu:untimeout"), None);
        assert_eq!(PanelId::parse("modlimit:explode:ban"), None);
        assert_eq!(PanelId::parse("other:form:ban"), None);
    }

    #[test]
    fn failures_are_reported_in_the_reply() {
        let err = Error::from(crate::core::limits::LedgerError::Storage("disk full".to_string()));
        assert_eq!(failure_reply(&err), "❌ Storage error: disk full");
    }

    #[test]
    fn timeout_menu_offers_untimeout() {
        assert_eq!(
            MenuKind::Timeout.forms(),
            &[FormKind::Timeout, FormKind::Untimeout]
        );
        assert_eq!(MenuKind::Kick.forms(), &[FormKind::Kick]);
    }
}
