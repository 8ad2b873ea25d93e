use burnish_client::ModelInfo;

/// Display label for a model provider.
pub fn provider_label(provider: &str) -> &str {
    match provider {
        "ollama" | "mock" => "Local",
        "claude" => "Cloud",
        "llama.cpp" => "Local (GPU)",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    pub label: String,
    pub models: Vec<ModelInfo>,
}

/// Groups the advertised models by provider label, preserving the order in
/// which labels and models first appear.
pub fn group_models(models: Vec<ModelInfo>) -> Vec<ModelGroup> {
    let mut groups: Vec<ModelGroup> = Vec::new();
    for model in models {
        let label = provider_label(&model.provider).to_owned();
        match groups.iter_mut().find(|group| group.label == label) {
            Some(group) => group.models.push(model),
            None => groups.push(ModelGroup {
                label,
                models: vec![model],
            }),
        }
    }
    groups
}
