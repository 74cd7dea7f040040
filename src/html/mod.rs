//! HTML rendering
//!
//! Server-rendered pages for the login gate and the dossier form. All user
//! supplied text goes through `html_escape` before it reaches the markup.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::form::FormState;

/// Tabs shown on the main page; only the first one has a working form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    LeagueDossier,
    MatchAnalysis,
    PlayerScouting,
    History,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::LeagueDossier, Tab::MatchAnalysis, Tab::PlayerScouting, Tab::History];

    pub fn slug(self) -> &'static str {
        match self {
            Tab::LeagueDossier => "liga",
            Tab::MatchAnalysis => "partida",
            Tab::PlayerScouting => "jogadores",
            Tab::History => "historico",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::LeagueDossier => "Dossiê da Liga",
            Tab::MatchAnalysis => "Análise de Partida",
            Tab::PlayerScouting => "Scout de Jogadores",
            Tab::History => "Histórico",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Tab> {
        Tab::ALL.into_iter().find(|tab| tab.slug() == slug)
    }
}

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}\
nav a{margin-right:1rem}nav a.active{font-weight:bold}\
.error{color:#b00020;border:1px solid #b00020;padding:.5rem}\
label{display:block;margin-top:.75rem}textarea{width:100%;height:28rem;font-family:monospace}";

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        encode_text(title),
        STYLE,
        body
    )
}

fn error_box(message: &str) -> String {
    format!("<p class=\"error\">{}</p>", encode_text(message))
}

/// Password prompt; nothing else renders for unauthenticated sessions
pub fn login_page(error: Option<&str>) -> String {
    let mut body = String::from("<h1>Gerador de Dossiê</h1>\n");
    if let Some(message) = error {
        body.push_str(&error_box(message));
    }
    body.push_str(
        "<form method=\"post\" action=\"/login\">\n\
         <label>Senha <input type=\"password\" name=\"password\" autofocus></label>\n\
         <button type=\"submit\">Entrar</button>\n</form>",
    );
    layout("Entrar", &body)
}

fn nav(active: Tab) -> String {
    let links: String = Tab::ALL
        .iter()
        .map(|tab| {
            let class = if *tab == active { " class=\"active\"" } else { "" };
            format!("<a href=\"/?tab={}\"{}>{}</a>", tab.slug(), class, tab.title())
        })
        .collect();
    format!(
        "<nav>{}<form method=\"post\" action=\"/logout\" style=\"display:inline\">\
         <button type=\"submit\">Sair</button></form></nav>",
        links
    )
}

fn dossier_form() -> &'static str {
    "<form method=\"post\" action=\"/dossier\" enctype=\"multipart/form-data\">\n\
     <label>Temporada <input name=\"temporada\" placeholder=\"2024-2025\"></label>\n\
     <label>Liga <input name=\"liga\" placeholder=\"HOL\"></label>\n\
     <label>País <input name=\"pais\" placeholder=\"Holanda\"></label>\n\
     <label>Tabela de classificação <input type=\"file\" name=\"classificacao\" accept=\"image/*\" multiple></label>\n\
     <label>Estatísticas <input type=\"file\" name=\"estatisticas\" accept=\"image/*\" multiple></label>\n\
     <button type=\"submit\">Gerar prompt</button>\n</form>"
}

/// Main page for an authenticated session
///
/// `flash` carries a one-off message (validation failures are not stored).
pub fn main_page(tab: Tab, form: &FormState, flash: Option<&str>) -> String {
    let mut body = format!("<h1>Gerador de Dossiê</h1>\n{}\n<h2>{}</h2>\n", nav(tab), tab.title());

    if tab != Tab::LeagueDossier {
        body.push_str("<p>Em breve.</p>");
        return layout(tab.title(), &body);
    }

    if let Some(message) = flash.or_else(|| form.error()) {
        body.push_str(&error_box(message));
        body.push('\n');
    }

    match form.prompt() {
        Some(prompt) => {
            body.push_str(&format!(
                "<p>Prompt gerado para {} ({}) em {}. Copie o texto abaixo.</p>\n\
                 <textarea readonly id=\"prompt\" data-league=\"{}\">{}</textarea>\n\
                 <form method=\"post\" action=\"/dossier/reset\">\
                 <button type=\"submit\">Limpar e começar de novo</button></form>",
                encode_text(&prompt.league),
                encode_text(&prompt.season),
                prompt.generated_on.format(crate::prompt::DATE_FORMAT),
                encode_double_quoted_attribute(&prompt.league),
                encode_text(&prompt.text),
            ));
        }
        None => body.push_str(dossier_form()),
    }

    layout(tab.title(), &body)
}
