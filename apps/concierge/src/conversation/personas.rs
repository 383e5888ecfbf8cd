//! Persona catalog and category picker entries.

use crate::models::persona::{CategoryOption, Persona, Suggestion};

pub const DEFAULT_SECTION: &str = "home";

fn suggestion(text: &str, description: Option<&str>, keywords: &[&str]) -> Suggestion {
    Suggestion {
        text: text.to_string(),
        description: description.map(str::to_string),
        keywords: (!keywords.is_empty()).then(|| keywords.iter().map(|k| k.to_string()).collect()),
        is_special: false,
    }
}

fn explore_by_category() -> Suggestion {
    Suggestion {
        text: "Explorar por categoria".to_string(),
        description: Some("Escolha um tipo de lugar perto de você".to_string()),
        keywords: None,
        is_special: true,
    }
}

fn persona(section_id: &str, title: &str, role: &str, greeting: &str, suggestions: Vec<Suggestion>) -> Persona {
    let mut suggestions = suggestions;
    suggestions.push(explore_by_category());
    Persona {
        section_id: section_id.to_string(),
        title: title.to_string(),
        role: role.to_string(),
        greeting: greeting.to_string(),
        suggestions,
    }
}

/// All personas, one per app section.
pub fn personas() -> Vec<Persona> {
    vec![
        persona(
            "home",
            "Concierge Pessoal",
            "assistente geral de viagens, gastronomia e lazer",
            "Olá! Para onde vamos hoje?",
            vec![
                suggestion("O que fazer neste fim de semana", None, &["passeios", "eventos"]),
                suggestion("Restaurantes bem avaliados", Some("para um jantar especial"), &[]),
            ],
        ),
        persona(
            "travel",
            "Especialista em Viagens",
            "planejador de roteiros, voos e hospedagem",
            "Vamos planejar sua próxima viagem?",
            vec![
                suggestion("Hotéis com ótimo custo-benefício em Lisboa", None, &["hospedagem"]),
                suggestion("Voos baratos para a Europa", Some("saindo de São Paulo"), &["passagens", "promoção"]),
                suggestion("Roteiro completo de 5 dias em Roma", None, &[]),
                suggestion("Praias paradisíacas no Nordeste", Some("águas calmas e cristalinas"), &["praia", "família"]),
            ],
        ),
        persona(
            "wine",
            "Sommelier",
            "especialista em vinhos, vinícolas e enoturismo",
            "Que tal descobrir uma vinícola nova?",
            vec![
                suggestion("Vinícolas para visitar no Vale dos Vinhedos", None, &["enoturismo", "degustação"]),
                suggestion("Restaurantes com boa carta de vinhos", None, &["harmonização"]),
                suggestion("Rotas do vinho em Portugal", Some("Douro e Alentejo"), &[]),
            ],
        ),
        persona(
            "explore",
            "Guia Local",
            "conhecedor de atrações, cultura e vida noturna",
            "Quer descobrir algo novo por perto?",
            vec![
                suggestion("Museus imperdíveis", None, &["arte", "história"]),
                suggestion("Bares com música ao vivo", None, &["vida noturna"]),
                suggestion("Parques para passear com crianças", None, &["família", "ar livre"]),
            ],
        ),
    ]
}

pub fn find_persona(section_id: &str) -> Option<Persona> {
    personas().into_iter().find(|p| p.section_id == section_id)
}

fn category(id: &str, label: &str, description: &str, icon: &str) -> CategoryOption {
    CategoryOption {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
    }
}

/// Entries of the category picker, in display order.
pub fn categories() -> Vec<CategoryOption> {
    vec![
        category("restaurants", "Restaurantes", "lugares bem avaliados para comer", "🍽️"),
        category("cafes", "Cafés", "cafeterias e padarias charmosas", "☕"),
        category("bars", "Bares", "bares e vida noturna", "🍸"),
        category("museums", "Museus", "museus e exposições", "🏛️"),
        category("parks", "Parques", "parques e áreas verdes", "🌳"),
        category("beaches", "Praias", "praias e orlas", "🏖️"),
        category("hotels", "Hotéis", "hospedagem com bom custo-benefício", "🏨"),
        category("wineries", "Vinícolas", "vinícolas e adegas para visitar", "🍷"),
    ]
}

pub fn find_category(id: &str) -> Option<CategoryOption> {
    categories().into_iter().find(|c| c.id == id)
}
