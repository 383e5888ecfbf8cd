// All prompt constants for the recommendation engine.
// Reuses cross-cutting fragments from llm_client::prompts.

/// First-page prompt template.
/// Replace: {persona_title}, {persona_role}, {section_context}, {query},
///          {location_section}, {category_restriction}, {geography_rule},
///          {image_rule}, {grounding_instruction}, {schema}
pub const FIRST_PAGE_TEMPLATE: &str = r#"You are {persona_title}. Your role: {persona_role}.
The user is talking to you from the "{section_context}" section of the app.

USER REQUEST:
{query}
{location_section}
CONTENT FILTER:
- If the request names a single product category (hotel, flight or restaurant), return ONLY items of that category.
- Mixing categories is allowed ONLY when the request explicitly asks for a "complete itinerary" or "general tips".
{category_restriction}
{geography_rule}

{image_rule}

{grounding_instruction}

Write every text field in Brazilian Portuguese. Return a JSON object with this EXACT schema:
{schema}"#;

/// Load-more prompt template. Asks for a fixed number of new items and no intro.
/// Replace: {persona_title}, {persona_role}, {section_context}, {previous_query},
///          {already_listed}, {batch_size}, {location_section},
///          {category_restriction}, {geography_rule}, {image_rule},
///          {grounding_instruction}, {schema}
pub const LOAD_MORE_TEMPLATE: &str = r#"You are {persona_title}. Your role: {persona_role}.
The user is talking to you from the "{section_context}" section of the app.

The user already received recommendations for this request:
"{previous_query}"

ALREADY LISTED (do NOT repeat any of these):
{already_listed}

Return EXACTLY {batch_size} NEW recommendations for the same request that were not previously listed.
Do NOT include an "intro" field.
{location_section}
CONTENT FILTER:
- Keep the same product category as the original request. Mix categories ONLY if it asked for a "complete itinerary" or "general tips".
{category_restriction}
{geography_rule}

{image_rule}

{grounding_instruction}

Write every text field in Brazilian Portuguese. Return a JSON object with this EXACT schema:
{schema}"#;

pub const GEOGRAPHY_RULE: &str = "GEOGRAPHY RULE:
- When an item is a city, country, region, island or beach, NEVER fill \"openHours\".
- For those items \"visitDuration\" and \"bestVisitTime\" are MANDATORY.";

/// Replace: {image_hosts}
pub const IMAGE_RULE_TEMPLATE: &str = "IMAGES:
- Prefer image URLs served from: {image_hosts}.
- If no image from those hosts is available, leave \"images\" empty. NEVER fabricate an image link.";

/// Replace: {location}
pub const LOCATION_SECTION_TEMPLATE: &str = "
USER LOCATION: The user is currently in {location}. Use it whenever the request refers to \"here\", \"nearby\" or similar.
";

/// Replace: {label}, {category}
pub const CATEGORY_RESTRICTION_TEMPLATE: &str =
    "RESTRICTION: This request is about {label} ONLY. Every item MUST have \"category\": \"{category}\". Do NOT add any other kind of item.";

/// Host patterns the model should take images from.
pub const IMAGE_HOST_ALLOWLIST: &[&str] = &[
    "images.unsplash.com",
    "upload.wikimedia.org",
    "*.googleusercontent.com",
    "*.bstatic.com",
    "*.tripadvisor.com",
];

pub const INTRO_FIELD_SCHEMA: &str =
    r#"  "intro": "string",  // one or two friendly sentences introducing the results, in the persona's voice"#;

/// One recommendation item, documented inline. Indented to sit inside the array.
pub const ITEM_SCHEMA: &str = r#"    {
      "category": "flight" | "hotel" | "general",  // exactly one of these three
      "icon": "string",                // a single emoji that represents the item
      "name": "string",                // proper name of the place, flight or hotel
      "description": "string",         // 1-2 sentences
      "link": "string",                // official or booking URL; empty if not confirmed
      "estimatedCost": "string",       // e.g. "R$ 150 por pessoa", "€95/noite"
      "reason": "string",              // why it matches the request
      "visitDuration": "string",       // e.g. "2-3 horas", "3 dias"
      "bestVisitTime": "string",       // e.g. "fim de tarde", "abril a junho"
      "reservationStatus": "required" | "recommended" | "not_needed" | "unknown",
      "tags": ["string"],              // short labels
      "highlights": ["string"],        // standout features

      // flight only
      "airline": "string",
      "flightNumber": "string",
      "departureTime": "string",       // local time, e.g. "22:35"
      "arrivalTime": "string",
      "departureAirport": "string",    // IATA code
      "arrivalAirport": "string",      // IATA code
      "duration": "string",            // e.g. "11h 20m"
      "stops": 0,                      // number of stops

      // hotel only
      "stars": 4,                      // 1-5
      "amenities": ["string"],
      "images": ["string"],            // image URLs from the allowed hosts only
      "address": "string",
      "rating": 4.5,                   // guest rating, 0-5
      "reviewCount": 1200,

      // general only (restaurants, attractions, places)
      "googleRating": 4.6,             // 0-5
      "establishmentType": "string",   // e.g. "restaurante", "museu", "praia", "cidade"
      "openHours": "string",           // NEVER for cities, countries, regions, islands or beaches
      "menuLink": "string",            // restaurants only
      "parking": "string"              // parking availability
    }"#;
