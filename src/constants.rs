/// Container image tag constants
pub mod tag {
    /// Tag implied when an image reference has none
    pub const DEFAULT: &str = "latest";
}

/// Cloud API endpoints and identifiers
pub mod api {
    /// Resource Manager projects endpoint
    pub const PROJECTS_URL: &str = "https://cloudresourcemanager.googleapis.com/v1/projects";

    /// Cloud Run admin endpoint (global)
    pub const RUN_URL: &str = "https://run.googleapis.com";

    /// Cloud Run regional endpoint, `{region}` is substituted
    pub const RUN_REGIONAL_URL: &str = "https://{region}-run.googleapis.com";

    /// Service Usage endpoint
    pub const USAGE_URL: &str = "https://serviceusage.googleapis.com/v1";

    /// Container Analysis endpoint
    pub const ANALYSIS_URL: &str = "https://containeranalysis.googleapis.com/v1";

    /// Service name for Cloud Run
    pub const CLOUD_RUN: &str = "run.googleapis.com";

    /// Project whose notes hold the public vulnerability feed
    pub const VULNZ_NOTE_PROJECT: &str = "goog-vulnz";

    /// Lifecycle state of a usable project
    pub const PROJECT_STATE_ACTIVE: &str = "ACTIVE";

    /// Service Usage state of an enabled API
    pub const SERVICE_STATE_ENABLED: &str = "ENABLED";
}

/// Registry manifest media types
pub mod media_type {
    pub const DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
    pub const DOCKER_MANIFEST_LIST: &str =
        "application/vnd.docker.distribution.manifest.list.v2+json";
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    pub const OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
}

/// Environment variables read by disco
pub mod env {
    /// Explicit OAuth access token
    pub const ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

    /// Access token override honored by the gcloud SDK
    pub const SDK_ACCESS_TOKEN: &str = "CLOUDSDK_AUTH_ACCESS_TOKEN";

    /// Default project for every command
    pub const PROJECT: &str = "DISCO_PROJECT";
}
