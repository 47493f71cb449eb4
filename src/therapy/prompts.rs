//! Prompt builders. All prompts are in Spanish (the therapy language) and
//! demand a single JSON object so `response_format = json_object` holds.

pub const SYSTEM_VNEST: &str = "Eres experto en generación de ejercicios VNeST.";
pub const SYSTEM_SR: &str = "Eres experto en Spaced Retrieval.";
pub const SYSTEM_PERSONALIZATION: &str =
    "Eres un terapeuta experto en lenguaje y afasia. Debes personalizar ejercicios de terapia.";
pub const SYSTEM_PROFILE: &str =
    "Eres un asistente experto en estructurar perfiles clínicos de pacientes con afasia.";

/// Step 1: candidate verbs for a context.
pub fn vnest_verbs_prompt(contexto: &str) -> String {
    format!(
        "Genera entre 9 y 12 verbos de acción transitivos, frecuentes y \
         relevantes para el contexto \"{contexto}\". Evita verbos copulativos \
         y auxiliares. Responde únicamente con un objeto JSON de la forma:\n\
         {{\"verbos\": [\"verbo1\", \"verbo2\", ...]}}"
    )
}

/// Step 2: classify the verbs by difficulty.
pub fn vnest_classify_prompt(contexto: &str, verbos: &[String]) -> String {
    format!(
        "Para el contexto \"{contexto}\", clasifica los siguientes verbos por \
         dificultad léxica para un paciente con afasia: {verbos:?}. Responde \
         únicamente con un objeto JSON de la forma:\n\
         {{\"verbos_clasificados\": {{\"facil\": [...], \"medio\": [...], \"dificil\": [...]}}}}"
    )
}

/// Step 3: pick one verb for the requested level and draft SVO sentences.
pub fn vnest_pairs_prompt(
    contexto: &str,
    verbos_clasificados: &serde_json::Value,
    nivel: &str,
    n_oraciones: usize,
) -> String {
    format!(
        "Contexto: \"{contexto}\". Nivel solicitado: \"{nivel}\". Verbos \
         clasificados: {verbos_clasificados}. Selecciona UN verbo adecuado al \
         nivel y construye {n_oraciones} oraciones sujeto-verbo-objeto con \
         agentes y pacientes variados y plausibles. Responde únicamente con \
         un objeto JSON de la forma:\n\
         {{\"verbo_seleccionado\": \"...\", \"oraciones\": \
         [{{\"sujeto\": \"...\", \"verbo\": \"...\", \"objeto\": \"...\"}}]}}"
    )
}

/// Step 4a: expand each SVO sentence with wh-questions.
pub fn vnest_expansion_prompt(verbo: &str, oraciones_svo: &serde_json::Value) -> String {
    format!(
        "Verbo: \"{verbo}\". Oraciones base: {oraciones_svo}. Expande cada \
         oración respondiendo dónde, cuándo y por qué ocurre la acción, \
         manteniendo el verbo. Responde únicamente con un objeto JSON de la \
         forma:\n{{\"verbo\": \"{verbo}\", \"expansiones\": \
         [{{\"sujeto\": \"...\", \"objeto\": \"...\", \"donde\": \"...\", \
         \"cuando\": \"...\", \"porque\": \"...\"}}]}}"
    )
}

/// Step 4b: assemble the final exercise from the expansions.
pub fn vnest_final_prompt(expansion: &serde_json::Value) -> String {
    format!(
        "A partir de estas expansiones: {expansion}, construye el ejercicio \
         VNeST final. Incluye los pares sujeto-objeto usados y exactamente 10 \
         oraciones de juicio semántico (mezcla de correctas e incorrectas). \
         Responde únicamente con un objeto JSON de la forma:\n\
         {{\"verbo\": \"...\", \"pares\": [{{\"sujeto\": \"...\", \"objeto\": \"...\"}}], \
         \"oraciones\": [{{\"texto\": \"...\", \"correcta\": true}}]}}"
    )
}

/// Spaced-retrieval cards from a patient profile.
pub fn sr_prompt(patient_profile: &serde_json::Value) -> String {
    format!(
        "Perfil del paciente: {patient_profile}. Genera 5 tarjetas de Spaced \
         Retrieval con preguntas personales sencillas cuya respuesta aparezca \
         en el perfil (nombres, lugares, rutinas, objetos significativos). \
         Una pregunta corta por tarjeta y una respuesta de pocas palabras. \
         Responde únicamente con un objeto JSON de la forma:\n\
         {{\"cards\": [{{\"stimulus\": \"...\", \"answer\": \"...\"}}]}}"
    )
}

/// Personalize an existing exercise for a patient.
pub fn personalization_prompt(
    base: &serde_json::Value,
    patient_profile: &serde_json::Value,
    user_id: &str,
) -> String {
    format!(
        "Ejercicio base: {base}. Perfil del paciente {user_id}: \
         {patient_profile}. Adapta el ejercicio a la vida del paciente \
         (personas, lugares y rutinas de su perfil) sin cambiar la terapia ni \
         la estructura: conserva el campo \"terapia\" y los mismos campos de \
         contenido que el ejercicio base, y agrega \"descripcion_adaptado\" \
         explicando brevemente la adaptación. Responde únicamente con el \
         objeto JSON del ejercicio adaptado."
    )
}

/// Structure free clinical text into a profile document.
pub fn profile_structure_prompt(raw_text: &str, user_id: &str) -> String {
    format!(
        "Texto libre sobre el paciente {user_id}:\n\"{raw_text}\"\n\
         Estructura la información en un perfil clínico. Usa las secciones \
         \"personal\", \"familia\", \"rutinas\" y \"objetos\"; dentro de cada \
         una incluye solo datos presentes en el texto, sin inventar nada. \
         Responde únicamente con el objeto JSON del perfil."
    )
}
