//! Built-in recipe catalog and named tool groups.
//!
//! The catalog covers the tools toolup ships with out of the box. User
//! recipes loaded from the recipe directory override these by id, so the
//! catalog is a starting point, not a ceiling. Version pins referenced as
//! `{{token}}` live in the default substitution map (see `config.rs`) and
//! can be overridden per machine.

use std::collections::BTreeMap;

use crate::platform::PlatformKey;
use crate::recipe::{PlatformSteps, RecipeSet, ToolRecipe};

/// All built-in recipes, validated by construction (see tests).
pub fn builtin_recipes() -> Vec<ToolRecipe> {
    vec![
        git_recipe(),
        docker_recipe(),
        nodejs_recipe(),
        python_recipe(),
        php_recipe(),
        code_server_recipe(),
        ros2_recipe(),
    ]
}

/// A recipe set pre-populated with the built-in catalog.
pub fn builtin_recipe_set() -> RecipeSet {
    let mut set = RecipeSet::new();
    for recipe in builtin_recipes() {
        set.insert(recipe);
    }
    set
}

/// Member tool ids for a named group, or `None` for an unknown group.
pub fn group_members(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "basic" => Some(&["git", "docker"]),
        "languages" => Some(&["nodejs", "python", "php"]),
        "panels" => Some(&["code_server"]),
        "robotics" => Some(&["ros2"]),
        _ => None,
    }
}

/// All group names, in display order.
pub fn group_names() -> &'static [&'static str] {
    &["basic", "languages", "panels", "robotics"]
}

// =============================================================================
// Recipe definitions
// =============================================================================

fn steps(
    check: &str,
    install: &[&str],
    post: &[&str],
) -> PlatformSteps {
    PlatformSteps {
        install_commands: install.iter().map(|s| s.trim().to_string()).collect(),
        check_command: check.to_string(),
        post_install: post.iter().map(|s| s.trim().to_string()).collect(),
    }
}

fn git_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "git".to_string(),
        name: "Git".to_string(),
        description: "Distributed version control".to_string(),
        category: "basic".to_string(),
        supported_platforms: vec![
            PlatformKey::LinuxUbuntu,
            PlatformKey::LinuxCentos,
            PlatformKey::LinuxArch,
            PlatformKey::Darwin,
        ],
        platforms: BTreeMap::from([
            (
                PlatformKey::LinuxUbuntu,
                steps(
                    "git --version",
                    &["apt-get update", "apt-get install -y git"],
                    &["git config --system init.defaultBranch main"],
                ),
            ),
            (
                PlatformKey::LinuxCentos,
                steps(
                    "git --version",
                    &["yum install -y git"],
                    &["git config --system init.defaultBranch main"],
                ),
            ),
            (
                PlatformKey::LinuxArch,
                steps(
                    "git --version",
                    &["pacman -S --noconfirm git"],
                    &["git config --system init.defaultBranch main"],
                ),
            ),
            (
                PlatformKey::Darwin,
                steps("git --version", &["brew install git"], &[]),
            ),
        ]),
    }
}

fn docker_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "docker".to_string(),
        name: "Docker".to_string(),
        description: "Container runtime and CLI".to_string(),
        category: "basic".to_string(),
        supported_platforms: vec![
            PlatformKey::LinuxUbuntu,
            PlatformKey::LinuxCentos,
            PlatformKey::LinuxGeneric,
        ],
        platforms: BTreeMap::from([
            (
                PlatformKey::LinuxUbuntu,
                steps(
                    "docker --version",
                    &["curl -fsSL https://get.docker.com | sh"],
                    &[
                        "systemctl enable docker",
                        "systemctl start docker",
                    ],
                ),
            ),
            (
                PlatformKey::LinuxCentos,
                steps(
                    "docker --version",
                    &["curl -fsSL https://get.docker.com | sh"],
                    &[
                        "systemctl enable docker",
                        "systemctl start docker",
                    ],
                ),
            ),
            (
                PlatformKey::LinuxGeneric,
                steps(
                    "docker --version",
                    &["curl -fsSL https://get.docker.com | sh"],
                    &[],
                ),
            ),
        ]),
    }
}

fn nodejs_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "nodejs".to_string(),
        name: "Node.js".to_string(),
        description: "JavaScript runtime with npm".to_string(),
        category: "languages".to_string(),
        supported_platforms: vec![
            PlatformKey::LinuxUbuntu,
            PlatformKey::LinuxCentos,
            PlatformKey::Darwin,
        ],
        platforms: BTreeMap::from([
            (
                PlatformKey::LinuxUbuntu,
                steps(
                    "node --version",
                    &[
                        "curl -fsSL https://deb.nodesource.com/setup_{{node_major}}.x | bash -",
                        "apt-get install -y nodejs",
                    ],
                    &["npm config set registry {{npm_registry}} --global"],
                ),
            ),
            (
                PlatformKey::LinuxCentos,
                steps(
                    "node --version",
                    &[
                        "curl -fsSL https://rpm.nodesource.com/setup_{{node_major}}.x | bash -",
                        "yum install -y nodejs",
                    ],
                    &["npm config set registry {{npm_registry}} --global"],
                ),
            ),
            (
                PlatformKey::Darwin,
                steps(
                    "node --version",
                    &["brew install node@{{node_major}}"],
                    &["npm config set registry {{npm_registry}} --global"],
                ),
            ),
        ]),
    }
}

fn python_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "python".to_string(),
        name: "Python".to_string(),
        description: "Python 3 with pip and venv".to_string(),
        category: "languages".to_string(),
        supported_platforms: vec![
            PlatformKey::LinuxUbuntu,
            PlatformKey::LinuxCentos,
            PlatformKey::Darwin,
        ],
        platforms: BTreeMap::from([
            (
                PlatformKey::LinuxUbuntu,
                steps(
                    "python3 --version",
                    &["apt-get install -y python3 python3-pip python3-venv"],
                    &["pip3 config set global.index-url {{pip_index_url}}"],
                ),
            ),
            (
                PlatformKey::LinuxCentos,
                steps(
                    "python3 --version",
                    &["yum install -y python3 python3-pip"],
                    &["pip3 config set global.index-url {{pip_index_url}}"],
                ),
            ),
            (
                PlatformKey::Darwin,
                steps(
                    "python3 --version",
                    &["brew install python@{{python_version}}"],
                    &[],
                ),
            ),
        ]),
    }
}

fn php_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "php".to_string(),
        name: "PHP".to_string(),
        description: "PHP runtime with composer".to_string(),
        category: "languages".to_string(),
        supported_platforms: vec![PlatformKey::LinuxUbuntu, PlatformKey::LinuxCentos],
        platforms: BTreeMap::from([
            (
                PlatformKey::LinuxUbuntu,
                steps(
                    "php --version",
                    &["apt-get install -y php-cli php-mbstring php-xml unzip"],
                    &[
                        "curl -fsSL https://getcomposer.org/installer | php -- --install-dir=/usr/local/bin --filename=composer",
                    ],
                ),
            ),
            (
                PlatformKey::LinuxCentos,
                steps(
                    "php --version",
                    &["yum install -y php-cli php-mbstring php-xml unzip"],
                    &[
                        "curl -fsSL https://getcomposer.org/installer | php -- --install-dir=/usr/local/bin --filename=composer",
                    ],
                ),
            ),
        ]),
    }
}

fn code_server_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "code_server".to_string(),
        name: "code-server".to_string(),
        description: "VS Code in the browser".to_string(),
        category: "panels".to_string(),
        supported_platforms: vec![PlatformKey::LinuxUbuntu, PlatformKey::LinuxGeneric],
        platforms: BTreeMap::from([
            (
                PlatformKey::LinuxUbuntu,
                steps(
                    "code-server --version",
                    &["curl -fsSL https://code-server.dev/install.sh | sh"],
                    &["systemctl enable --now code-server@$USER"],
                ),
            ),
            (
                PlatformKey::LinuxGeneric,
                steps(
                    "code-server --version",
                    &["curl -fsSL https://code-server.dev/install.sh | sh"],
                    &[],
                ),
            ),
        ]),
    }
}

fn ros2_recipe() -> ToolRecipe {
    ToolRecipe {
        id: "ros2".to_string(),
        name: "ROS 2".to_string(),
        description: "Robot Operating System 2 middleware".to_string(),
        category: "robotics".to_string(),
        supported_platforms: vec![PlatformKey::LinuxUbuntu],
        platforms: BTreeMap::from([(
            PlatformKey::LinuxUbuntu,
            steps(
                "test -d /opt/ros/{{ros_distro}}",
                &[
                    "apt-get install -y software-properties-common curl",
                    "add-apt-repository -y universe",
                    "curl -fsSL https://raw.githubusercontent.com/ros/rosdistro/master/ros.key -o /usr/share/keyrings/ros-archive-keyring.gpg",
                    "echo \"deb [arch=$(dpkg --print-architecture) signed-by=/usr/share/keyrings/ros-archive-keyring.gpg] http://packages.ros.org/ros2/ubuntu $(. /etc/os-release && echo $UBUNTU_CODENAME) main\" > /etc/apt/sources.list.d/ros2.list",
                    "apt-get update",
                    "apt-get install -y ros-{{ros_distro}}-ros-base",
                ],
                &["echo 'source /opt/ros/{{ros_distro}}/setup.bash' >> /etc/skel/.bashrc"],
            ),
        )]),
    }
}
