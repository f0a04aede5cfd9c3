//! The supported tools.
//!
//! Every entry targets `x86_64` Linux release assets.

use usr_local_pull::spec::{AppSpec, AssetRule, AssetSelector, Install, MemberRule, PostStep};
use usr_local_pull::version::{SplitRule, VersionProbe};

const fn file(name: &'static str, install: Install) -> MemberRule {
    MemberRule::File { name, install }
}

const fn man(name: &'static str) -> MemberRule {
    file(name, Install::ManPage(1))
}

const fn completion(name: &'static str, app: &'static str) -> MemberRule {
    file(name, Install::Completion(app))
}

const fn affixes(prefix: &'static str, suffix: &'static str) -> AssetSelector {
    AssetSelector::Affixes { prefix, suffix }
}

const fn probe(index: isize) -> VersionProbe {
    VersionProbe::new(SplitRule::Whitespace, index)
}

pub const AST_GREP: AppSpec = AppSpec {
    name: "ast-grep",
    owner: "ast-grep",
    repo: "ast-grep",
    binary: "ast-grep",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("app-x86_64-unknown-linux-gnu.zip"),
        &[MemberRule::binary("ast-grep"), MemberRule::binary("sg")],
    )],
    post: &[],
    notice: None,
};

pub const BAT: AppSpec = AppSpec {
    name: "bat",
    owner: "sharkdp",
    repo: "bat",
    binary: "bat",
    probe: probe(1),
    assets: &[AssetRule::archive(
        affixes("bat-", "-x86_64-unknown-linux-gnu.tar.gz"),
        &[
            MemberRule::binary("bat"),
            man("bat.1"),
            completion("bat.zsh", "bat"),
        ],
    )],
    post: &[],
    notice: None,
};

pub const DASEL: AppSpec = AppSpec {
    name: "dasel",
    owner: "TomWright",
    repo: "dasel",
    binary: "dasel",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("dasel_linux_amd64.gz"),
        &[file("dasel_linux_amd64", Install::Binary("dasel"))],
    )],
    post: &[
        PostStep::completion("dasel", &["completion", "zsh"]),
        PostStep::ManPages {
            binary: "dasel",
            args: &["man", "--output-directory", PostStep::DIR_PLACEHOLDER],
        },
    ],
    notice: None,
};

pub const EZA: AppSpec = AppSpec {
    name: "eza",
    owner: "eza-community",
    repo: "eza",
    binary: "eza",
    probe: probe(-3),
    assets: &[
        AssetRule::archive(
            AssetSelector::Exact("eza_x86_64-unknown-linux-gnu.tar.gz"),
            &[MemberRule::binary("eza")],
        ),
        AssetRule::archive(
            affixes("completions-", ".tar.gz"),
            &[completion("_eza", "eza")],
        ),
        AssetRule::archive(affixes("man-", ".tar.gz"), &[MemberRule::ManPages]),
    ],
    post: &[],
    notice: None,
};

pub const FD: AppSpec = AppSpec {
    name: "fd",
    owner: "sharkdp",
    repo: "fd",
    binary: "fd",
    probe: probe(1),
    assets: &[AssetRule::archive(
        affixes("fd-", "-x86_64-unknown-linux-gnu.tar.gz"),
        &[MemberRule::binary("fd"), man("fd.1"), completion("_fd", "fd")],
    )],
    post: &[],
    notice: None,
};

pub const FNM: AppSpec = AppSpec {
    name: "fnm",
    owner: "Schniz",
    repo: "fnm",
    binary: "fnm",
    probe: probe(1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("fnm-linux.zip"),
        &[MemberRule::binary("fnm")],
    )],
    post: &[PostStep::completion("fnm", &["completions", "--shell", "zsh"])],
    notice: Some(
        "add to .zshrc: `eval \"$(fnm env --use-on-cd --shell zsh \
         --version-file-strategy=recursive --corepack-enabled)\"`",
    ),
};

pub const FZF: AppSpec = AppSpec {
    name: "fzf",
    owner: "junegunn",
    repo: "fzf",
    binary: "fzf",
    probe: probe(0),
    assets: &[
        AssetRule::archive(
            affixes("fzf-", "-linux_amd64.tar.gz"),
            &[MemberRule::binary("fzf")],
        ),
        AssetRule::archive(AssetSelector::Tarball, &[man("fzf.1"), man("fzf-tmux.1")]),
    ],
    post: &[PostStep::completion("fzf", &["--zsh"])],
    notice: None,
};

pub const GITLEAKS: AppSpec = AppSpec {
    name: "gitleaks",
    owner: "gitleaks",
    repo: "gitleaks",
    binary: "gitleaks",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        affixes("gitleaks_", "_linux_x64.tar.gz"),
        &[MemberRule::binary("gitleaks")],
    )],
    post: &[PostStep::completion("gitleaks", &["completion", "zsh"])],
    notice: None,
};

pub const GOJQ: AppSpec = AppSpec {
    name: "gojq",
    owner: "itchyny",
    repo: "gojq",
    binary: "gojq",
    probe: probe(1),
    assets: &[AssetRule::archive(
        affixes("gojq_", "_linux_amd64.tar.gz"),
        &[MemberRule::binary("gojq"), completion("_gojq", "gojq")],
    )],
    post: &[],
    notice: None,
};

pub const JID: AppSpec = AppSpec {
    name: "jid",
    owner: "simeji",
    repo: "jid",
    binary: "jid",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("jid_linux_amd64.zip"),
        &[MemberRule::binary("jid")],
    )],
    post: &[],
    notice: None,
};

pub const JQ: AppSpec = AppSpec {
    name: "jq",
    owner: "jqlang",
    repo: "jq",
    binary: "jq",
    probe: VersionProbe::new(SplitRule::Hyphen, -1),
    assets: &[
        AssetRule::archive(affixes("jq-", ".tar.gz"), &[man("jq.1")]),
        AssetRule::raw(AssetSelector::Exact("jq-linux-amd64"), Install::Binary("jq")),
    ],
    post: &[],
    notice: None,
};

pub const JQP: AppSpec = AppSpec {
    name: "jqp",
    owner: "noahgorstein",
    repo: "jqp",
    binary: "jqp",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("jqp_Linux_x86_64.tar.gz"),
        &[MemberRule::binary("jqp")],
    )],
    post: &[],
    notice: None,
};

pub const LAZYGIT: AppSpec = AppSpec {
    name: "lazygit",
    owner: "jesseduffield",
    repo: "lazygit",
    binary: "lazygit",
    probe: VersionProbe::new(
        SplitRule::KeyValue {
            separator: ',',
            key: "version",
        },
        0,
    ),
    assets: &[AssetRule::archive(
        affixes("lazygit_", "_Linux_x86_64.tar.gz"),
        &[MemberRule::binary("lazygit")],
    )],
    post: &[],
    notice: None,
};

pub const MDBOOK: AppSpec = AppSpec {
    name: "mdbook",
    owner: "rust-lang",
    repo: "mdBook",
    binary: "mdbook",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        affixes("mdbook-", "-x86_64-unknown-linux-gnu.tar.gz"),
        &[MemberRule::binary("mdbook")],
    )],
    post: &[PostStep::completion("mdbook", &["completions", "zsh"])],
    notice: None,
};

pub const NEOVIDE: AppSpec = AppSpec {
    name: "neovide",
    owner: "neovide",
    repo: "neovide",
    binary: "neovide",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("neovide-linux-x86_64.tar.gz"),
        &[MemberRule::binary("neovide")],
    )],
    post: &[],
    notice: None,
};

pub const RESTISH: AppSpec = AppSpec {
    name: "restish",
    owner: "rest-sh",
    repo: "restish",
    binary: "restish",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        affixes("restish-", "-linux-amd64.tar.gz"),
        &[MemberRule::binary("restish")],
    )],
    post: &[],
    notice: None,
};

pub const RIPGREP: AppSpec = AppSpec {
    name: "ripgrep",
    owner: "BurntSushi",
    repo: "ripgrep",
    binary: "rg",
    probe: probe(1),
    assets: &[AssetRule::archive(
        affixes("ripgrep_", "_amd64.deb"),
        &[
            MemberRule::binary("rg"),
            man("rg.1.gz"),
            completion("_rg", "rg"),
        ],
    )
    .nested("data.tar.xz")],
    post: &[],
    notice: None,
};

pub const RUST_ANALYZER: AppSpec = AppSpec {
    name: "rust-analyzer",
    owner: "rust-lang",
    repo: "rust-analyzer",
    binary: "rust-analyzer",
    // Compares the build date in `--version` with the date tag. A binary
    // built the day before its tag reports an older date and is reinstalled
    // on every run.
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("rust-analyzer-x86_64-unknown-linux-gnu.gz"),
        &[file(
            "rust-analyzer-x86_64-unknown-linux-gnu",
            Install::Binary("rust-analyzer"),
        )],
    )],
    post: &[],
    notice: None,
};

pub const STARSHIP: AppSpec = AppSpec {
    name: "starship",
    owner: "starship",
    repo: "starship",
    binary: "starship",
    probe: probe(1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("starship-x86_64-unknown-linux-gnu.tar.gz"),
        &[MemberRule::binary("starship")],
    )],
    post: &[PostStep::completion("starship", &["completions", "zsh"])],
    notice: Some("add to .zshrc: `eval \"$(starship init zsh)\"`"),
};

pub const STYLUA: AppSpec = AppSpec {
    name: "stylua",
    owner: "JohnnyMorganz",
    repo: "StyLua",
    binary: "stylua",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("stylua-linux-x86_64.zip"),
        &[MemberRule::binary("stylua")],
    )],
    post: &[],
    notice: None,
};

pub const UV: AppSpec = AppSpec {
    name: "uv",
    owner: "astral-sh",
    repo: "uv",
    binary: "uv",
    probe: probe(1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("uv-x86_64-unknown-linux-gnu.tar.gz"),
        &[MemberRule::binary("uv"), MemberRule::binary("uvx")],
    )],
    post: &[
        PostStep::completion("uv", &["generate-shell-completion", "zsh"]),
        PostStep::Completion {
            binary: "uvx",
            args: &["--generate-shell-completion", "zsh"],
            app: "uvx",
        },
    ],
    notice: None,
};

pub const XQ: AppSpec = AppSpec {
    name: "xq",
    owner: "sibprogrammer",
    repo: "xq",
    binary: "xq",
    probe: probe(2),
    assets: &[AssetRule::archive(
        affixes("xq_", "_linux_amd64.tar.gz"),
        &[MemberRule::binary("xq")],
    )],
    post: &[],
    notice: None,
};

pub const YQ: AppSpec = AppSpec {
    name: "yq",
    owner: "mikefarah",
    repo: "yq",
    binary: "yq",
    probe: probe(-1),
    assets: &[AssetRule::archive(
        AssetSelector::Exact("yq_linux_amd64.tar.gz"),
        &[file("yq_linux_amd64", Install::Binary("yq")), man("yq.1")],
    )],
    post: &[PostStep::completion("yq", &["completion", "zsh"])],
    notice: None,
};

/// Every supported tool, in install order.
pub const APPS: &[AppSpec] = &[
    AST_GREP,
    BAT,
    DASEL,
    EZA,
    FD,
    FNM,
    FZF,
    GITLEAKS,
    GOJQ,
    JID,
    JQ,
    JQP,
    LAZYGIT,
    MDBOOK,
    NEOVIDE,
    RESTISH,
    RIPGREP,
    RUST_ANALYZER,
    STARSHIP,
    STYLUA,
    UV,
    XQ,
    YQ,
];

/// Looks up a tool by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static AppSpec> {
    APPS.iter().find(|app| app.name == name)
}
